//! 出题流程 - 流程层
//!
//! 定义"一份试卷"从请求到开考的流程：
//!
//! 1. 校验表单
//! 2. 调用出题服务
//! 3. 规范化（失败时兜底题库）
//! 4. 组装试卷、检查题数
//! 5. 后台保存，通知用户

use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::clients::ExamGenerator;
use crate::config::Config;
use crate::error::{GenerationError, SessionError};
use crate::infrastructure::{append_exam, Clock, ExamStore};
use crate::models::{Exam, ExamRequest};
use crate::services::{ContentNormalizer, NotificationSink, NotifyLevel, Strategy};
use crate::utils::logging::{log_exam_created, truncate_text};
use crate::workflow::exam_session::ExamSession;

/// 实际题数与请求题数不一致，只是警告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountMismatch {
    pub requested: u32,
    pub generated: usize,
}

impl fmt::Display for CountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Generated {} questions (requested {})",
            self.generated, self.requested
        )
    }
}

/// 出题结果
#[derive(Debug)]
pub struct GeneratedExam {
    pub exam: Arc<Exam>,
    pub strategy: Strategy,
    pub count_mismatch: Option<CountMismatch>,
    /// 后台保存任务，可以不等待
    pub persisted: JoinHandle<()>,
}

/// 出题流程
///
/// - 编排 生成 → 规范化 → 组装 → 保存
/// - 只依赖 trait 对象，不关心具体实现
/// - 保存失败会通知用户，但不影响返回的试卷
pub struct ExamFlow {
    generator: Arc<dyn ExamGenerator>,
    store: Arc<dyn ExamStore>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    normalizer: ContentNormalizer,
    user_id: String,
}

impl ExamFlow {
    pub fn new(
        config: &Config,
        generator: Arc<dyn ExamGenerator>,
        store: Arc<dyn ExamStore>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            generator,
            store,
            notifier,
            clock,
            normalizer: ContentNormalizer::new(config.cap_to_requested),
            user_id: config.user_id.clone(),
        }
    }

    /// 生成一份试卷
    pub async fn generate(&self, request: &ExamRequest) -> Result<GeneratedExam, GenerationError> {
        if let Err(e) = request.validate() {
            if let GenerationError::InvalidRequest { reason } = &e {
                self.notifier.notify(NotifyLevel::Error, reason);
            }
            return Err(e);
        }

        let generation_request = request.generation_request();
        info!(
            "📝 请求出题: {} / {} ({}, {} 题)",
            generation_request.subject,
            generation_request.topic,
            generation_request.difficulty,
            generation_request.requested_question_count
        );

        let envelope = match self.generator.generate(&generation_request).await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("⚠️ 出题服务调用失败: {:#}", e);
                self.notifier
                    .notify(NotifyLevel::Error, "Failed to generate exam. Please try again.");
                return Err(GenerationError::upstream(&e));
            }
        };

        if !envelope.success {
            warn!("⚠️ 出题服务拒绝了请求: {}", truncate_text(&envelope.result.to_string(), 120));
            self.notifier
                .notify(NotifyLevel::Error, "Failed to generate exam. Please try again.");
            return Err(GenerationError::Upstream {
                message: "出题服务返回 success=false".to_string(),
            });
        }

        let normalized = self.normalizer.run(&envelope.result, &generation_request);
        if normalized.questions.is_empty() {
            self.notifier
                .notify(NotifyLevel::Error, "No questions could be generated.");
            return Err(GenerationError::NoQuestions);
        }

        let now = self.clock.now();
        let exam = Arc::new(Exam {
            id: format!("exam_{}", now.timestamp_millis()),
            subject: generation_request.subject.clone(),
            topic: generation_request.topic.clone(),
            difficulty: generation_request.difficulty,
            question_types: generation_request.question_types.clone(),
            requested_question_count: generation_request.requested_question_count,
            time_limit_minutes: request.time_limit_minutes,
            questions: normalized.questions,
            created_at: now,
            ai_result: Some(envelope.result),
        });

        let count_mismatch = self.check_count(&exam);
        let persisted = self.persist(Arc::clone(&exam));

        log_exam_created(&exam);
        self.notifier
            .notify(NotifyLevel::Success, "Exam generated successfully!");

        Ok(GeneratedExam {
            exam,
            strategy: normalized.strategy,
            count_mismatch,
            persisted,
        })
    }

    /// 开考
    pub fn start_session(&self, exam: Arc<Exam>) -> Result<ExamSession, SessionError> {
        match ExamSession::start(exam, self.clock.now()) {
            Ok(session) => {
                self.notifier.notify(NotifyLevel::Info, "Exam started! Good luck!");
                Ok(session)
            }
            Err(e) => {
                warn!("⚠️ 无法开考: {}", e);
                self.notifier.notify(
                    NotifyLevel::Error,
                    "Invalid exam data. Please regenerate the exam.",
                );
                Err(e)
            }
        }
    }

    fn check_count(&self, exam: &Exam) -> Option<CountMismatch> {
        let generated = exam.question_count();
        if generated == exam.requested_question_count as usize {
            return None;
        }

        let mismatch = CountMismatch {
            requested: exam.requested_question_count,
            generated,
        };
        warn!("⚠️ 题数不一致: 请求 {} 题，实际 {} 题", mismatch.requested, mismatch.generated);
        self.notifier
            .notify(NotifyLevel::Warning, &mismatch.to_string());
        Some(mismatch)
    }

    fn persist(&self, exam: Arc<Exam>) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let user_id = self.user_id.clone();
        tokio::spawn(async move {
            match append_exam(store.as_ref(), &user_id, &exam).await {
                Ok(()) => info!("💾 试卷已保存: {}", exam.id),
                Err(e) => {
                    warn!("⚠️ 试卷保存失败 ({}): {}", exam.id, e);
                    notifier.notify(
                        NotifyLevel::Error,
                        "Exam generated but failed to save locally",
                    );
                }
            }
        })
    }
}
