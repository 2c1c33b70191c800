//! 流程层（Workflow Layer）
//!
//! - `exam_flow` - 一份试卷从请求到开考
//! - `exam_session` - 一次限时考试的状态机

pub mod exam_flow;
pub mod exam_session;

pub use exam_flow::{CountMismatch, ExamFlow, GeneratedExam};
pub use exam_session::{format_remaining, ExamSession, SessionSnapshot, SessionStatus, Tick};
