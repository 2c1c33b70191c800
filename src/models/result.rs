use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::exam::Difficulty;

/// 未作答时展示的占位文本
pub const NO_ANSWER: &str = "No answer";

/// 成绩档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackTier {
    Excellent,
    Good,
    NeedsPractice,
}

impl FeedbackTier {
    /// `>= 80` 优秀，`60..80` 良好，其余需要练习
    pub fn from_score(score: u32) -> Self {
        if score >= 80 {
            FeedbackTier::Excellent
        } else if score >= 60 {
            FeedbackTier::Good
        } else {
            FeedbackTier::NeedsPractice
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "excellent",
            FeedbackTier::Good => "good",
            FeedbackTier::NeedsPractice => "needs-practice",
        }
    }

    /// 给学习者看的评语
    pub fn message(self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "Excellent work!",
            FeedbackTier::Good => "Good job! Keep practicing.",
            FeedbackTier::NeedsPractice => "Keep studying and try again.",
        }
    }
}

/// 单题评分明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    pub prompt: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: String,
}

/// 一次考试的最终结果，生成后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: String,
    pub exam_id: String,
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub score: u32,
    pub correct_count: usize,
    pub total_questions: usize,
    pub time_taken_minutes: u32,
    pub per_question: Vec<QuestionOutcome>,
    pub feedback_tier: FeedbackTier,
    pub feedback: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ExamResult {
    /// 形如 `Score: 70% (7/10)`
    pub fn summary(&self) -> String {
        format!(
            "Score: {}% ({}/{})",
            self.score, self.correct_count, self.total_questions
        )
    }
}
