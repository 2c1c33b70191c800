use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// 单选题
    #[default]
    Mcq,
    /// 文本作答题
    Text,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Text => "text",
        }
    }

    /// 宽松解析上游返回的题型字符串
    ///
    /// 上游模型常用 `multiple_choice`、`short-answer` 之类的写法
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "mcq" | "multiple_choice" | "multiplechoice" | "choice" | "single_choice" => {
                Some(QuestionType::Mcq)
            }
            "text" | "short_answer" | "open" | "open_ended" | "free_text" | "essay"
            | "written" => Some(QuestionType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_loose(s).ok_or_else(|| format!("未知题型: {}", s))
    }
}

/// 规范化后的题目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

/// 题目不合格的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionDefect {
    EmptyId,
    EmptyPrompt,
    EmptyAnswer,
    MissingOptions,
    TooFewOptions,
    DuplicateOption,
    AnswerNotInOptions,
    UnexpectedOptions,
}

impl fmt::Display for QuestionDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            QuestionDefect::EmptyId => "题目ID为空",
            QuestionDefect::EmptyPrompt => "题干为空",
            QuestionDefect::EmptyAnswer => "正确答案为空",
            QuestionDefect::MissingOptions => "选择题缺少选项",
            QuestionDefect::TooFewOptions => "选择题选项少于2个",
            QuestionDefect::DuplicateOption => "选项重复",
            QuestionDefect::AnswerNotInOptions => "正确答案不在选项中",
            QuestionDefect::UnexpectedOptions => "文本题不应包含选项",
        };
        f.write_str(msg)
    }
}

impl Question {
    /// 检查题目是否满足数据模型约束，返回第一个问题
    pub fn defect(&self) -> Option<QuestionDefect> {
        if self.id.trim().is_empty() {
            return Some(QuestionDefect::EmptyId);
        }
        if self.prompt.trim().is_empty() {
            return Some(QuestionDefect::EmptyPrompt);
        }
        if self.correct_answer.trim().is_empty() {
            return Some(QuestionDefect::EmptyAnswer);
        }

        match (self.question_type, &self.options) {
            (QuestionType::Mcq, None) => Some(QuestionDefect::MissingOptions),
            (QuestionType::Mcq, Some(options)) => {
                if options.len() < 2 {
                    return Some(QuestionDefect::TooFewOptions);
                }
                let mut seen = HashSet::new();
                if !options.iter().all(|o| seen.insert(o.as_str())) {
                    return Some(QuestionDefect::DuplicateOption);
                }
                if !options.contains(&self.correct_answer) {
                    return Some(QuestionDefect::AnswerNotInOptions);
                }
                None
            }
            (QuestionType::Text, Some(_)) => Some(QuestionDefect::UnexpectedOptions),
            (QuestionType::Text, None) => None,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.defect().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(options: &[&str], answer: &str) -> Question {
        Question {
            id: "q_1".to_string(),
            question_type: QuestionType::Mcq,
            prompt: "Pick one".to_string(),
            options: Some(options.iter().map(|s| s.to_string()).collect()),
            correct_answer: answer.to_string(),
            explanation: String::new(),
        }
    }

    #[test]
    fn test_parse_loose_variants() {
        assert_eq!(QuestionType::parse_loose("MCQ"), Some(QuestionType::Mcq));
        assert_eq!(QuestionType::parse_loose("multiple-choice"), Some(QuestionType::Mcq));
        assert_eq!(QuestionType::parse_loose("Short Answer"), Some(QuestionType::Text));
        assert_eq!(QuestionType::parse_loose("essay"), Some(QuestionType::Text));
        assert_eq!(QuestionType::parse_loose("matching"), None);
    }

    #[test]
    fn test_well_formed_mcq() {
        assert!(mcq(&["a", "b"], "b").is_well_formed());
    }

    #[test]
    fn test_mcq_defects() {
        assert_eq!(mcq(&["a"], "a").defect(), Some(QuestionDefect::TooFewOptions));
        assert_eq!(mcq(&["a", "a"], "a").defect(), Some(QuestionDefect::DuplicateOption));
        assert_eq!(mcq(&["a", "b"], "c").defect(), Some(QuestionDefect::AnswerNotInOptions));
        assert_eq!(mcq(&["a", "b"], "").defect(), Some(QuestionDefect::EmptyAnswer));

        let mut missing = mcq(&["a", "b"], "a");
        missing.options = None;
        assert_eq!(missing.defect(), Some(QuestionDefect::MissingOptions));
    }

    #[test]
    fn test_text_question_must_not_carry_options() {
        let mut q = mcq(&["a", "b"], "a");
        q.question_type = QuestionType::Text;
        assert_eq!(q.defect(), Some(QuestionDefect::UnexpectedOptions));

        q.options = None;
        assert!(q.is_well_formed());
    }

    #[test]
    fn test_serde_uses_type_field() {
        let q = mcq(&["a", "b"], "a");
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["type"], "mcq");
        assert_eq!(json["correct_answer"], "a");

        let back: Question = serde_json::from_value(json).unwrap();
        assert_eq!(back, q);
    }
}
