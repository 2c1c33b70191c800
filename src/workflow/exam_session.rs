//! 考试会话 - 流程层
//!
//! 一次限时考试的状态机：`Active` → `Finished`。
//!
//! 会话本身不持有计时器，`tick` 由外部驱动（见 `orchestrator::session_runner`），
//! 所以这里所有操作都是同步的纯状态变更，便于测试。

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::models::{Exam, ExamResult, Question};
use crate::services::scoring::{self, Submission};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Finished,
}

/// 一次 `tick` 的结果
#[derive(Debug, Clone)]
pub enum Tick {
    /// 继续计时
    Running { remaining_seconds: u32 },
    /// 本次 tick 让时间归零，会话已自动交卷
    Expired(Arc<ExamResult>),
    /// 会话已结束，忽略
    Ignored,
}

/// 给界面用的只读快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub exam_id: String,
    pub status: SessionStatus,
    pub current_index: usize,
    pub total_questions: usize,
    pub answered_count: usize,
    pub answers: BTreeMap<usize, String>,
    pub remaining_seconds: u32,
    pub remaining_display: String,
    pub progress_percent: f64,
}

/// 考试会话
///
/// 职责：
/// - 维护当前题号、作答和剩余时间
/// - 时间归零或手动交卷时只评分一次
/// - 拒绝会话结束后的作答和导航
#[derive(Debug)]
pub struct ExamSession {
    exam: Arc<Exam>,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    current_index: usize,
    answers: BTreeMap<usize, String>,
    remaining_seconds: u32,
    result: Option<Arc<ExamResult>>,
}

impl ExamSession {
    /// 开考
    ///
    /// 试卷必须有题目、每道题合格、题目 ID 唯一、时间限制为正
    pub fn start(exam: Arc<Exam>, now: DateTime<Utc>) -> Result<Self, SessionError> {
        validate_exam(&exam)?;

        info!(
            "📝 开考: {} ({} 题, {} 分钟)",
            exam.id,
            exam.questions.len(),
            exam.time_limit_minutes
        );

        Ok(Self {
            remaining_seconds: exam.time_limit_seconds(),
            exam,
            status: SessionStatus::Active,
            started_at: now,
            current_index: 0,
            answers: BTreeMap::new(),
            result: None,
        })
    }

    /// 计时器走一秒
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.status == SessionStatus::Finished {
            return Tick::Ignored;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return Tick::Running {
                remaining_seconds: self.remaining_seconds,
            };
        }

        info!("⏰ 考试 {} 时间到，自动交卷", self.exam.id);
        Tick::Expired(self.finish(now))
    }

    /// 记录第 `index` 题的作答，重复提交覆盖之前的答案
    pub fn submit_answer(&mut self, index: usize, value: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.ensure_in_range(index)?;
        self.answers.insert(index, value.into());
        Ok(())
    }

    /// 跳到指定题目
    pub fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.ensure_active()?;
        self.ensure_in_range(index)?;
        self.current_index = index;
        Ok(index)
    }

    /// 下一题，已经是最后一题时返回 `IndexOutOfRange`
    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.go_to(self.current_index + 1)
    }

    /// 上一题，第一题时停在原地
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.ensure_active()?;
        self.current_index = self.current_index.saturating_sub(1);
        Ok(self.current_index)
    }

    /// 交卷
    ///
    /// 任何状态都可以调用；只有第一次调用会评分，之后返回同一个结果
    pub fn finish(&mut self, now: DateTime<Utc>) -> Arc<ExamResult> {
        if let Some(result) = &self.result {
            debug!("考试 {} 已交卷，返回已有结果", self.exam.id);
            return Arc::clone(result);
        }

        self.status = SessionStatus::Finished;
        let result = Arc::new(scoring::finalize(&Submission {
            exam: &self.exam,
            answers: &self.answers,
            remaining_seconds: self.remaining_seconds,
            started_at: self.started_at,
            completed_at: now,
        }));

        info!(
            "🏁 考试 {} 结束: {} - {}",
            self.exam.id,
            result.summary(),
            result.feedback
        );

        self.result = Some(Arc::clone(&result));
        result
    }

    // ========== 只读访问 ==========

    pub fn exam(&self) -> &Arc<Exam> {
        &self.exam
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.exam.questions[self.current_index]
    }

    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn result(&self) -> Option<&Arc<ExamResult>> {
        self.result.as_ref()
    }

    /// `(current_index + 1) / len * 100`
    pub fn progress_percent(&self) -> f64 {
        let len = self.exam.questions.len();
        if len == 0 {
            return 0.0;
        }
        (self.current_index + 1) as f64 / len as f64 * 100.0
    }

    /// 形如 `4:05`
    pub fn remaining_display(&self) -> String {
        format_remaining(self.remaining_seconds)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            exam_id: self.exam.id.clone(),
            status: self.status,
            current_index: self.current_index,
            total_questions: self.exam.questions.len(),
            answered_count: self.answers.len(),
            answers: self.answers.clone(),
            remaining_seconds: self.remaining_seconds,
            remaining_display: self.remaining_display(),
            progress_percent: self.progress_percent(),
        }
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Active => Ok(()),
            SessionStatus::Finished => Err(SessionError::SessionNotActive),
        }
    }

    fn ensure_in_range(&self, index: usize) -> Result<(), SessionError> {
        let len = self.exam.questions.len();
        if index < len {
            Ok(())
        } else {
            Err(SessionError::IndexOutOfRange { index, len })
        }
    }
}

/// 秒数格式化为 `m:ss`
pub fn format_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn validate_exam(exam: &Exam) -> Result<(), SessionError> {
    if exam.questions.is_empty() {
        return Err(SessionError::invalid_exam("试卷没有题目"));
    }
    if exam.time_limit_minutes == 0 {
        return Err(SessionError::invalid_exam("时间限制必须为正数"));
    }

    let mut ids = HashSet::new();
    for (index, question) in exam.questions.iter().enumerate() {
        if let Some(defect) = question.defect() {
            return Err(SessionError::invalid_exam(format!(
                "第 {} 题不合格: {}",
                index + 1,
                defect
            )));
        }
        if !ids.insert(question.id.as_str()) {
            return Err(SessionError::invalid_exam(format!(
                "题目ID重复: {}",
                question.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, FeedbackTier, QuestionType, NO_ANSWER};
    use chrono::{Duration, TimeZone};

    fn question(n: usize) -> Question {
        Question {
            id: format!("q_{}", n),
            question_type: QuestionType::Mcq,
            prompt: format!("Question {}?", n),
            options: Some(vec!["right".to_string(), "wrong".to_string()]),
            correct_answer: "right".to_string(),
            explanation: String::new(),
        }
    }

    fn exam(count: usize, minutes: u32) -> Arc<Exam> {
        Arc::new(Exam {
            id: "exam_42".to_string(),
            subject: "Math".to_string(),
            topic: "Algebra".to_string(),
            difficulty: Difficulty::Intermediate,
            question_types: vec![QuestionType::Mcq],
            requested_question_count: count as u32,
            time_limit_minutes: minutes,
            questions: (1..=count).map(question).collect(),
            created_at: t0(),
            ai_result: None,
        })
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_start_initial_state() {
        let session = ExamSession::start(exam(3, 2), t0()).unwrap();
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.current_index(), 0);
        assert!(session.answers().is_empty());
        assert_eq!(session.remaining_seconds(), 120);
        assert_eq!(session.remaining_display(), "2:00");
        assert_eq!(session.current_question().id, "q_1");
    }

    #[test]
    fn test_start_rejects_invalid_exams() {
        let empty = Arc::new(Exam {
            questions: vec![],
            ..(*exam(1, 1)).clone()
        });
        assert!(matches!(
            ExamSession::start(empty, t0()),
            Err(SessionError::InvalidExam { .. })
        ));

        let no_time = exam(2, 0);
        assert!(ExamSession::start(no_time, t0()).is_err());

        let mut duplicated = (*exam(2, 1)).clone();
        duplicated.questions[1].id = "q_1".to_string();
        assert!(ExamSession::start(Arc::new(duplicated), t0()).is_err());

        let mut malformed = (*exam(2, 1)).clone();
        malformed.questions[0].correct_answer = "not an option".to_string();
        assert!(ExamSession::start(Arc::new(malformed), t0()).is_err());
    }

    #[test]
    fn test_submit_answer_overwrites_and_rejects_out_of_range() {
        let mut session = ExamSession::start(exam(2, 1), t0()).unwrap();
        session.submit_answer(0, "wrong").unwrap();
        session.submit_answer(0, "right").unwrap();
        assert_eq!(session.answers().get(&0).map(String::as_str), Some("right"));

        let err = session.submit_answer(2, "right").unwrap_err();
        assert_eq!(err, SessionError::IndexOutOfRange { index: 2, len: 2 });
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut session = ExamSession::start(exam(3, 1), t0()).unwrap();

        assert_eq!(session.previous().unwrap(), 0);
        assert_eq!(session.next().unwrap(), 1);
        assert_eq!(session.next().unwrap(), 2);
        assert!(matches!(session.next(), Err(SessionError::IndexOutOfRange { .. })));
        assert_eq!(session.current_index(), 2);
        assert!(session.go_to(7).is_err());
        assert_eq!(session.go_to(1).unwrap(), 1);
        assert!((session.progress_percent() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut session = ExamSession::start(exam(2, 1), t0()).unwrap();
        session.submit_answer(0, "right").unwrap();

        let first = session.finish(t0() + Duration::seconds(20));
        let second = session.finish(t0() + Duration::seconds(50));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.completed_at, t0() + Duration::seconds(20));
        assert_eq!(first.score, 50);
        assert_eq!(first.per_question[1].user_answer, NO_ANSWER);
    }

    #[test]
    fn test_operations_after_finish_are_rejected() {
        let mut session = ExamSession::start(exam(2, 1), t0()).unwrap();
        session.finish(t0());

        assert_eq!(session.submit_answer(0, "right"), Err(SessionError::SessionNotActive));
        assert_eq!(session.next(), Err(SessionError::SessionNotActive));
        assert_eq!(session.previous(), Err(SessionError::SessionNotActive));
        assert!(matches!(session.tick(t0()), Tick::Ignored));
    }

    #[test]
    fn test_ticks_until_expiry() {
        let mut session = ExamSession::start(exam(2, 1), t0()).unwrap();
        session.submit_answer(0, "right").unwrap();
        session.submit_answer(1, "right").unwrap();

        for i in 1..60 {
            match session.tick(t0() + Duration::seconds(i)) {
                Tick::Running { remaining_seconds } => assert_eq!(remaining_seconds, 60 - i as u32),
                other => panic!("unexpected tick {:?}", other),
            }
        }

        let result = match session.tick(t0() + Duration::seconds(60)) {
            Tick::Expired(result) => result,
            other => panic!("expected expiry, got {:?}", other),
        };
        assert_eq!(session.status(), SessionStatus::Finished);
        assert_eq!(session.remaining_seconds(), 0);
        assert_eq!(result.time_taken_minutes, 1);
        assert_eq!(result.score, 100);
        assert_eq!(result.feedback_tier, FeedbackTier::Excellent);
        assert!(Arc::ptr_eq(&result, session.result().unwrap()));
        assert!(matches!(session.tick(t0()), Tick::Ignored));
    }

    #[test]
    fn test_snapshot_and_display() {
        let mut session = ExamSession::start(exam(4, 5), t0()).unwrap();
        session.submit_answer(3, "wrong").unwrap();
        for _ in 0..55 {
            session.tick(t0());
        }

        let snap = session.snapshot();
        assert_eq!(snap.remaining_display, "4:05");
        assert_eq!(snap.answered_count, 1);
        assert_eq!(snap.total_questions, 4);
        assert_eq!(snap.progress_percent, 25.0);
        assert_eq!(format_remaining(9), "0:09");
    }
}
