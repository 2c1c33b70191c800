use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::config::Config;
use crate::error::GenerationError;
use crate::models::question::{Question, QuestionType};

/// 难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(format!("未知难度: {}", s)),
        }
    }
}

/// 发给出题服务的请求，同时也是规范化的上下文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub requested_question_count: u32,
    pub question_types: Vec<QuestionType>,
}

impl GenerationRequest {
    /// 第 `index` 题（0-based）按轮转得到的题型
    pub fn type_for(&self, index: usize) -> QuestionType {
        if self.question_types.is_empty() {
            return QuestionType::default();
        }
        self.question_types[index % self.question_types.len()]
    }
}

/// 用户提交的出题表单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRequest {
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub question_count: u32,
    pub time_limit_minutes: u32,
    pub question_types: Vec<QuestionType>,
}

impl ExamRequest {
    /// 使用表单默认值：中等难度、10 题、30 分钟、单选
    pub fn new(subject: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            topic: topic.into(),
            difficulty: Difficulty::Intermediate,
            question_count: 10,
            time_limit_minutes: 30,
            question_types: vec![QuestionType::Mcq],
        }
    }

    /// 使用配置中的默认值
    pub fn from_config(config: &Config, subject: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            difficulty: config.default_difficulty,
            question_count: config.default_question_count,
            time_limit_minutes: config.default_time_limit_minutes,
            ..Self::new(subject, topic)
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_question_count(mut self, count: u32) -> Self {
        self.question_count = count;
        self
    }

    pub fn with_time_limit(mut self, minutes: u32) -> Self {
        self.time_limit_minutes = minutes;
        self
    }

    pub fn with_question_types(mut self, types: Vec<QuestionType>) -> Self {
        self.question_types = types;
        self
    }

    /// 校验表单
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.subject.trim().is_empty() || self.topic.trim().is_empty() {
            return Err(GenerationError::invalid_request(
                "Please fill in subject and topic",
            ));
        }
        if self.question_count == 0 {
            return Err(GenerationError::invalid_request("题目数量必须为正数"));
        }
        if self.time_limit_minutes == 0 {
            return Err(GenerationError::invalid_request("时间限制必须为正数"));
        }
        if self.question_types.is_empty() {
            return Err(GenerationError::invalid_request("至少选择一种题型"));
        }
        Ok(())
    }

    pub fn generation_request(&self) -> GenerationRequest {
        GenerationRequest {
            subject: self.subject.trim().to_string(),
            topic: self.topic.trim().to_string(),
            difficulty: self.difficulty,
            requested_question_count: self.question_count,
            question_types: self.question_types.clone(),
        }
    }
}

/// 一份生成好的试卷，创建后只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question_types: Vec<QuestionType>,
    pub requested_question_count: u32,
    pub time_limit_minutes: u32,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    /// 上游原始返回，便于排查解析问题
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_result: Option<Value>,
}

impl Exam {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// 时间限制对应的秒数
    pub fn time_limit_seconds(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }
}
