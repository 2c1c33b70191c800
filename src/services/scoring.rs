//! 评分服务 - 业务能力层
//!
//! 纯函数：给定试卷、作答和时间，算出 `ExamResult`。
//! 不持有状态，不关心计时器和会话流程。

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::models::{Exam, ExamResult, FeedbackTier, Question, QuestionOutcome, NO_ANSWER};

/// 一次交卷所需的全部输入
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    pub exam: &'a Exam,
    /// 题目下标 -> 作答内容
    pub answers: &'a BTreeMap<usize, String>,
    pub remaining_seconds: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// 严格相等判分：未作答永远不算对
pub fn is_correct(question: &Question, answer: Option<&str>) -> bool {
    matches!(answer, Some(a) if a == question.correct_answer)
}

/// `round(correct / total * 100)`，半数向上取整；没有题目时为 0
pub fn score_percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u64;
    let total = total as u64;
    ((200 * correct + total) / (2 * total)) as u32
}

/// `round((limit*60 - remaining) / 60)`，用时不会为负
pub fn time_taken_minutes(time_limit_minutes: u32, remaining_seconds: u32) -> u32 {
    let elapsed = time_limit_minutes
        .saturating_mul(60)
        .saturating_sub(remaining_seconds);
    elapsed.saturating_add(30) / 60
}

/// 交卷评分
pub fn finalize(submission: &Submission<'_>) -> ExamResult {
    let exam = submission.exam;

    let per_question: Vec<QuestionOutcome> = exam
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let answer = submission.answers.get(&index).map(String::as_str);
            let shown = match answer {
                Some(a) if !a.is_empty() => a.to_string(),
                _ => NO_ANSWER.to_string(),
            };
            QuestionOutcome {
                question_id: question.id.clone(),
                prompt: question.prompt.clone(),
                user_answer: shown,
                correct_answer: question.correct_answer.clone(),
                is_correct: is_correct(question, answer),
                explanation: question.explanation.clone(),
            }
        })
        .collect();

    let total_questions = per_question.len();
    let correct_count = per_question.iter().filter(|o| o.is_correct).count();
    let score = score_percent(correct_count, total_questions);
    let feedback_tier = FeedbackTier::from_score(score);

    ExamResult {
        id: format!("result_{}", submission.completed_at.timestamp_millis()),
        exam_id: exam.id.clone(),
        subject: exam.subject.clone(),
        topic: exam.topic.clone(),
        difficulty: exam.difficulty,
        score,
        correct_count,
        total_questions,
        time_taken_minutes: time_taken_minutes(exam.time_limit_minutes, submission.remaining_seconds),
        per_question,
        feedback_tier,
        feedback: feedback_tier.message().to_string(),
        started_at: submission.started_at,
        completed_at: submission.completed_at,
    }
}
