//! 会话驱动器 - 编排层
//!
//! ## 职责
//!
//! 一个 tokio 任务独占 `ExamSession`，同时驱动计时器和处理调用方命令。
//!
//! ```text
//! SessionHandle ──mpsc──┐
//!                       ├── select! ──> ExamSession
//! interval.tick() ──────┘
//! ```
//!
//! 计时器和手动交卷在同一个 `select!` 循环里串行执行，
//! 由 `finish` 的幂等性保证只评分一次。
//! 交卷后：通知用户，后台保存成绩，后台调用可选的判分服务。

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clients::{EvaluationSubmission, Evaluator};
use crate::config::Config;
use crate::error::SessionError;
use crate::infrastructure::{record_result, Clock, ExamStore};
use crate::models::ExamResult;
use crate::services::{NotificationSink, NotifyLevel};
use crate::utils::logging::log_result;
use crate::workflow::{ExamSession, SessionSnapshot, Tick};

const COMMAND_BUFFER: usize = 32;

/// 会话结束后用到的协作者
#[derive(Clone)]
pub struct RunnerDeps {
    pub store: Arc<dyn ExamStore>,
    pub notifier: Arc<dyn NotificationSink>,
    pub evaluator: Arc<dyn Evaluator>,
    pub clock: Arc<dyn Clock>,
    pub user_id: String,
    pub tick_interval: Duration,
}

impl RunnerDeps {
    pub fn new(
        config: &Config,
        store: Arc<dyn ExamStore>,
        notifier: Arc<dyn NotificationSink>,
        evaluator: Arc<dyn Evaluator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            evaluator,
            clock,
            user_id: config.user_id.clone(),
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
        }
    }
}

/// 会话如何结束
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub result: Arc<ExamResult>,
    pub timed_out: bool,
}

enum SessionCommand {
    Answer {
        index: usize,
        value: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    GoTo {
        index: usize,
        reply: oneshot::Sender<Result<usize, SessionError>>,
    },
    Next {
        reply: oneshot::Sender<Result<usize, SessionError>>,
    },
    Previous {
        reply: oneshot::Sender<Result<usize, SessionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Finish {
        reply: oneshot::Sender<Arc<ExamResult>>,
    },
}

/// 调用方持有的句柄，可以克隆
///
/// 所有句柄释放后会话自动交卷
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    result: Arc<OnceLock<Arc<ExamResult>>>,
}

impl SessionHandle {
    pub async fn answer(&self, index: usize, value: impl Into<String>) -> Result<(), SessionError> {
        let value = value.into();
        self.request(|reply| SessionCommand::Answer { index, value, reply })
            .await?
    }

    pub async fn go_to(&self, index: usize) -> Result<usize, SessionError> {
        self.request(|reply| SessionCommand::GoTo { index, reply }).await?
    }

    pub async fn next(&self) -> Result<usize, SessionError> {
        self.request(|reply| SessionCommand::Next { reply }).await?
    }

    pub async fn previous(&self) -> Result<usize, SessionError> {
        self.request(|reply| SessionCommand::Previous { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// 交卷；会话已经结束时返回已有的结果
    pub async fn finish(&self) -> Result<Arc<ExamResult>, SessionError> {
        if let Some(result) = self.result() {
            return Ok(result);
        }
        match self.request(|reply| SessionCommand::Finish { reply }).await {
            Ok(result) => Ok(result),
            Err(_) => self.result().ok_or(SessionError::SessionNotActive),
        }
    }

    /// 已经产生的结果
    pub fn result(&self) -> Option<Arc<ExamResult>> {
        self.result.get().cloned()
    }

    pub fn is_finished(&self) -> bool {
        self.result.get().is_some()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| SessionError::SessionNotActive)?;
        rx.await.map_err(|_| SessionError::SessionNotActive)
    }
}

/// 启动会话任务
///
/// 返回的 `JoinHandle` 在成绩写入存储后完成；判分服务不在等待范围内
pub fn spawn(session: ExamSession, deps: RunnerDeps) -> (SessionHandle, JoinHandle<SessionOutcome>) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let slot = Arc::new(OnceLock::new());
    let handle = SessionHandle {
        commands: tx,
        result: Arc::clone(&slot),
    };
    let task = tokio::spawn(run(session, rx, deps, slot));
    (handle, task)
}

async fn run(
    mut session: ExamSession,
    mut commands: mpsc::Receiver<SessionCommand>,
    deps: RunnerDeps,
    slot: Arc<OnceLock<Arc<ExamResult>>>,
) -> SessionOutcome {
    let mut ticker = tokio::time::interval(deps.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    // interval 的第一次 tick 立即完成
    ticker.tick().await;

    let (result, timed_out) = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Tick::Expired(result) = session.tick(deps.clock.now()) {
                    break (result, true);
                }
            }
            command = commands.recv() => match command {
                Some(command) => {
                    if let Some(result) = apply(&mut session, command, &deps, &slot) {
                        break (result, false);
                    }
                }
                None => {
                    info!("所有句柄已释放，自动交卷: {}", session.exam().id);
                    break (session.finish(deps.clock.now()), false);
                }
            }
        }
    };
    let _ = slot.set(Arc::clone(&result));

    if timed_out {
        deps.notifier.notify(
            NotifyLevel::Warning,
            "Time is up! Exam submitted automatically.",
        );
    }
    deps.notifier.notify(
        NotifyLevel::Success,
        &format!("Exam completed! {}", result.summary()),
    );
    log_result(&result);

    let submission = EvaluationSubmission::new(session.exam(), session.answers());
    let evaluator = Arc::clone(&deps.evaluator);
    tokio::spawn(async move {
        match evaluator.evaluate(&submission).await {
            Ok(response) => debug!("外部判分返回: {}", response),
            Err(e) => warn!("⚠️ 外部判分失败 ({}): {:#}", submission.exam_id, e),
        }
    });

    let store = Arc::clone(&deps.store);
    let notifier = Arc::clone(&deps.notifier);
    let user_id = deps.user_id.clone();
    let stored = Arc::clone(&result);
    let persisted = tokio::spawn(async move {
        match record_result(store.as_ref(), &user_id, &stored).await {
            Ok(()) => info!("💾 成绩已保存: {}", stored.id),
            Err(e) => {
                warn!("⚠️ 成绩保存失败 ({}): {}", stored.id, e);
                notifier.notify(
                    NotifyLevel::Error,
                    "Exam completed but failed to save results locally",
                );
            }
        }
    });
    if let Err(e) = persisted.await {
        warn!("⚠️ 成绩保存任务异常退出: {}", e);
    }

    SessionOutcome { result, timed_out }
}

/// 执行一条命令；交卷时返回结果并结束循环
fn apply(
    session: &mut ExamSession,
    command: SessionCommand,
    deps: &RunnerDeps,
    slot: &OnceLock<Arc<ExamResult>>,
) -> Option<Arc<ExamResult>> {
    match command {
        SessionCommand::Answer { index, value, reply } => {
            let _ = reply.send(session.submit_answer(index, value));
        }
        SessionCommand::GoTo { index, reply } => {
            let _ = reply.send(session.go_to(index));
        }
        SessionCommand::Next { reply } => {
            let _ = reply.send(session.next());
        }
        SessionCommand::Previous { reply } => {
            let _ = reply.send(session.previous());
        }
        SessionCommand::Snapshot { reply } => {
            let _ = reply.send(session.snapshot());
        }
        SessionCommand::Finish { reply } => {
            let result = session.finish(deps.clock.now());
            let _ = slot.set(Arc::clone(&result));
            let _ = reply.send(Arc::clone(&result));
            return Some(result);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::NoopEvaluator;
    use crate::infrastructure::{FailingStore, MemoryStore, SystemClock};
    use crate::models::{Difficulty, Exam, Question, QuestionType};
    use crate::services::RecordingNotifier;
    use chrono::Utc;
    use tokio_test::{assert_err, assert_ok};

    fn exam(minutes: u32) -> Arc<Exam> {
        let questions = (1..=3)
            .map(|n| Question {
                id: format!("q_{}", n),
                question_type: QuestionType::Mcq,
                prompt: format!("Question {}?", n),
                options: Some(vec!["yes".to_string(), "no".to_string()]),
                correct_answer: "yes".to_string(),
                explanation: String::new(),
            })
            .collect();
        Arc::new(Exam {
            id: "exam_runner".to_string(),
            subject: "Math".to_string(),
            topic: "Logic".to_string(),
            difficulty: Difficulty::Beginner,
            question_types: vec![QuestionType::Mcq],
            requested_question_count: 3,
            time_limit_minutes: minutes,
            questions,
            created_at: Utc::now(),
            ai_result: None,
        })
    }

    fn deps(store: Arc<MemoryStore>, notifier: Arc<RecordingNotifier>) -> RunnerDeps {
        RunnerDeps::new(
            &Config::default(),
            store,
            notifier,
            Arc::new(NoopEvaluator),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_finish_then_commands_rejected() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let session = ExamSession::start(exam(10), Utc::now()).unwrap();
        let (handle, task) = spawn(session, deps(store.clone(), notifier.clone()));

        assert_ok!(handle.answer(0, "yes").await);
        assert_ok!(handle.answer(1, "no").await);
        assert_eq!(handle.next().await, Ok(1));
        assert_eq!(handle.previous().await, Ok(0));
        assert_eq!(handle.previous().await, Ok(0));
        assert_err!(handle.answer(5, "yes").await);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.answered_count, 2);

        let first = handle.finish().await.unwrap();
        let second = handle.finish().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.correct_count, 1);
        assert_eq!(first.score, 33);

        assert_eq!(handle.answer(2, "yes").await, Err(SessionError::SessionNotActive));

        let outcome = task.await.unwrap();
        assert!(!outcome.timed_out);
        assert!(Arc::ptr_eq(&outcome.result, &first));
        assert_eq!(store.load_history("demo-user").await.unwrap()[0].id, first.id);
        assert_eq!(
            notifier.messages(),
            vec!["Exam completed! Score: 33% (1/3)"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_expiry_finishes_once() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let session = ExamSession::start(exam(1), Utc::now()).unwrap();
        let (handle, task) = spawn(session, deps(store.clone(), notifier.clone()));

        assert_ok!(handle.answer(0, "yes").await);
        tokio::time::sleep(Duration::from_secs(30)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.remaining_seconds <= 31 && snapshot.remaining_seconds >= 29);

        let outcome = task.await.unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.result.time_taken_minutes, 1);

        let late = handle.finish().await.unwrap();
        assert!(Arc::ptr_eq(&late, &outcome.result));
        assert_eq!(
            notifier.messages(),
            vec![
                "Time is up! Exam submitted automatically.",
                "Exam completed! Score: 33% (1/3)"
            ]
        );
        assert_eq!(store.load_history("demo-user").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_save_failure_notifies_user() {
        let notifier = Arc::new(RecordingNotifier::new());
        let deps = RunnerDeps::new(
            &Config::default(),
            Arc::new(FailingStore::default()),
            notifier.clone(),
            Arc::new(NoopEvaluator),
            Arc::new(SystemClock),
        );
        let session = ExamSession::start(exam(10), Utc::now()).unwrap();
        let (handle, task) = spawn(session, deps);

        assert_ok!(handle.answer(0, "yes").await);
        let result = handle.finish().await.unwrap();
        assert_eq!(result.correct_count, 1);

        let outcome = task.await.unwrap();
        assert!(Arc::ptr_eq(&outcome.result, &result));
        let entries = notifier.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].level, NotifyLevel::Error);
        assert_eq!(
            entries[1].message,
            "Exam completed but failed to save results locally"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_finishes_session() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let session = ExamSession::start(exam(5), Utc::now()).unwrap();
        let (handle, task) = spawn(session, deps(store, notifier));

        let cloned = handle.clone();
        drop(handle);
        assert_ok!(cloned.answer(2, "yes").await);
        drop(cloned);

        let outcome = task.await.unwrap();
        assert!(!outcome.timed_out);
        assert_eq!(outcome.result.correct_count, 1);
    }
}
