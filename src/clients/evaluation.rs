//! 判分客户端
//!
//! 交卷后把作答发给可选的外部判分服务。结果只用于日志，
//! 失败不影响本地评分。

use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::models::Exam;

/// 单题作答
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub user_answer: String,
}

/// 发给判分服务的内容：`{exam_id, answers: [{question_id, user_answer}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSubmission {
    pub exam_id: String,
    pub answers: Vec<SubmittedAnswer>,
}

impl EvaluationSubmission {
    /// 只包含已作答的题目，按题号排序；题号越界的作答被丢弃
    pub fn new(exam: &Exam, answers: &BTreeMap<usize, String>) -> Self {
        let answers = answers
            .iter()
            .filter_map(|(index, value)| {
                exam.questions.get(*index).map(|question| SubmittedAnswer {
                    question_id: question.id.clone(),
                    user_answer: value.clone(),
                })
            })
            .collect();

        Self {
            exam_id: exam.id.clone(),
            answers,
        }
    }
}

/// 外部判分服务
pub trait Evaluator: Send + Sync {
    fn evaluate<'a>(&'a self, submission: &'a EvaluationSubmission) -> BoxFuture<'a, Result<Value>>;
}

/// 不调用任何服务
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvaluator;

impl Evaluator for NoopEvaluator {
    fn evaluate<'a>(&'a self, submission: &'a EvaluationSubmission) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            debug!("跳过外部判分: {} ({} 题)", submission.exam_id, submission.answers.len());
            Ok(json!({ "skipped": true }))
        })
    }
}
