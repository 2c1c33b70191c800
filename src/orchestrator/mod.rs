//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 持有资源和任务，调度流程层，不做具体业务判断。
//!
//! ### `session_runner` - 会话驱动器
//! - 独占一个 `ExamSession`
//! - 用 tokio interval 驱动计时，用 mpsc 接收命令
//! - 交卷后通知、保存成绩、调用判分服务
//!
//! ### `app` - 命令行应用
//! - 初始化配置、存储、通知
//! - 出题并输出结果
//!
//! ## 层次关系
//!
//! ```text
//! app / session_runner
//!     ↓
//! workflow (ExamFlow / ExamSession)
//!     ↓
//! services (normalizer / question_bank / scoring / notifier)
//!     ↓
//! infrastructure / clients (store / clock / generator / evaluator)
//! ```

pub mod app;
pub mod session_runner;

pub use app::{App, CliArgs};
pub use session_runner::{spawn, RunnerDeps, SessionHandle, SessionOutcome};
