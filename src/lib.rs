//! # Exam Coach
//!
//! 限时模拟考试引擎：把模型生成的任意内容规范成试卷，驱动一次限时考试并评分。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - 存储（`ExamStore`）和时钟（`Clock`）
//! - `clients/` - 出题服务（`ExamGenerator`）和判分服务（`Evaluator`）
//!
//! ### ② 业务能力层（Services）
//! - `ContentNormalizer` - 任意形状的上游内容 → 规范题目
//! - `question_bank` - 按科目分桶的兜底题库
//! - `scoring` - 纯函数评分
//! - `NotificationSink` - 给用户的提示
//!
//! ### ③ 流程层（Workflow）
//! - `ExamFlow` - 校验 → 生成 → 规范化 → 组装 → 保存
//! - `ExamSession` - 限时考试状态机
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/session_runner` - 独占会话的 tokio 任务，驱动计时
//! - `orchestrator/app` - 命令行入口
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, GenerationError, SessionError, StoreError};
pub use models::{Difficulty, Exam, ExamRequest, ExamResult, FeedbackTier, Question, QuestionType};
pub use orchestrator::{App, CliArgs, SessionHandle};
pub use services::{ContentNormalizer, Strategy};
pub use workflow::{CountMismatch, ExamFlow, ExamSession, GeneratedExam, SessionStatus, Tick};
