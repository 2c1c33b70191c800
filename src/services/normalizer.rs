//! 题目规范化服务 - 业务能力层
//!
//! 把上游模型返回的任意形状内容转换成规范的 `Vec<Question>`。
//!
//! ## 策略顺序
//!
//! 1. `StructuredResult` - 对象（或其 `result` 字段）里的 `questions` 数组
//! 2. `EmbeddedJson` - 字符串中第一个 `{` 到最后一个 `}` 之间的 JSON
//! 3. `FreeText` - 按 `Question 1` / `Q1` / `1.` 切块，解析 `A)`..`D)` 选项
//! 4. `Fallback` - 按科目分桶的兜底题库
//!
//! 第一个产出至少一道合格题目的策略胜出。本模块从不返回错误，
//! 失败的策略只记录日志。

use regex::Regex;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::models::{GenerationRequest, Question, QuestionType};
use crate::services::question_bank;
use crate::utils::logging::truncate_text;

/// 规范化使用的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    StructuredResult,
    EmbeddedJson,
    FreeText,
    Fallback,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::StructuredResult => "structured-result",
            Strategy::EmbeddedJson => "embedded-json",
            Strategy::FreeText => "free-text",
            Strategy::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// 规范化结果
#[derive(Debug, Clone)]
pub struct Normalized {
    pub strategy: Strategy,
    pub questions: Vec<Question>,
}

/// 自由文本解析用到的正则
struct TextPatterns {
    /// 题号：`Question 3`、`Q3`、行首的 `3.`
    marker: Regex,
    /// 行首的 `A)` .. `D)` 选项
    option: Regex,
    /// `Answer: B` / `Correct: B` / `Solution: B`
    choice_answer: Regex,
    /// `Answer: ...` / `Solution: ...` 整行
    text_answer: Regex,
    explanation: Regex,
}

impl TextPatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            marker: Regex::new(r"(?im)(?:^[ \t]*(?:Q\d+\b|\d+\.)|\bQuestion\s+\d+)")?,
            option: Regex::new(r"(?m)^[ \t]*\(?([A-D])\)[ \t]*(\S[^\r\n]*)")?,
            choice_answer: Regex::new(
                r"\b(?i:correct\s+answer|answer|correct|solution)\s*(?i:is\s*)?[:\-]?\s*\(?([A-D])\b",
            )?,
            text_answer: Regex::new(r"(?i)\b(?:answer|solution)\s*:\s*([^\r\n]+)")?,
            explanation: Regex::new(r"(?i)\bexplanation\s*:\s*([^\r\n]+)")?,
        })
    }
}

/// 题目规范化服务
///
/// 职责：
/// - 依次尝试各个解析策略
/// - 保证输出的每道题都满足数据模型约束
/// - 保证题目 ID 在同一份试卷内唯一
pub struct ContentNormalizer {
    cap_to_requested: bool,
    patterns: Option<TextPatterns>,
}

impl ContentNormalizer {
    /// 创建规范化服务
    ///
    /// `cap_to_requested` 为 true 时，解析结果会截断到请求题数
    pub fn new(cap_to_requested: bool) -> Self {
        let patterns = match TextPatterns::compile() {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("⚠️ 自由文本正则编译失败，将跳过该策略: {}", e);
                None
            }
        };
        Self {
            cap_to_requested,
            patterns,
        }
    }

    /// 规范化上游返回，只返回题目列表
    pub fn normalize(&self, raw: &Value, request: &GenerationRequest) -> Vec<Question> {
        self.run(raw, request).questions
    }

    /// 规范化上游返回，同时给出胜出的策略
    pub fn run(&self, raw: &Value, request: &GenerationRequest) -> Normalized {
        let payload = unwrap_result(raw);

        if let Some(questions) = self.structured(payload, request) {
            return self.finish(Strategy::StructuredResult, questions, request);
        }
        debug!("结构化解析未得到题目");

        if let Some(text) = payload.as_str() {
            if let Some(questions) = self.embedded_json(text, request) {
                return self.finish(Strategy::EmbeddedJson, questions, request);
            }
            debug!("内嵌 JSON 解析未得到题目");
        }

        let text: Cow<'_, str> = match payload {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            Value::Null => Cow::Borrowed(""),
            other => Cow::Owned(other.to_string()),
        };
        if let Some(questions) = self.free_text(&text, request) {
            return self.finish(Strategy::FreeText, questions, request);
        }
        debug!("自由文本解析未得到题目: {}", truncate_text(&text, 80));

        warn!(
            "⚠️ 所有解析策略均失败，使用兜底题库 (科目: {}, 主题: {})",
            request.subject, request.topic
        );
        let questions = self.fallback(request);
        self.finish(Strategy::Fallback, questions, request)
    }

    /// 策略 1：结构化对象
    pub fn structured(&self, payload: &Value, request: &GenerationRequest) -> Option<Vec<Question>> {
        let items = questions_array(payload)?;
        self.map_items(items, request)
    }

    /// 策略 2：字符串中内嵌的 JSON
    pub fn embedded_json(&self, text: &str, request: &GenerationRequest) -> Option<Vec<Question>> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start {
            return None;
        }

        let parsed: Value = match serde_json::from_str(&text[start..=end]) {
            Ok(v) => v,
            Err(e) => {
                debug!("内嵌 JSON 无法解析: {}", e);
                return None;
            }
        };

        let items = parsed.get("questions")?.as_array()?;
        self.map_items(items, request)
    }

    /// 策略 3：自由文本
    pub fn free_text(&self, text: &str, request: &GenerationRequest) -> Option<Vec<Question>> {
        let patterns = self.patterns.as_ref()?;

        let starts: Vec<(usize, usize)> = patterns
            .marker
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();
        if starts.is_empty() {
            return None;
        }

        let mut questions = Vec::new();
        for (index, &(_, body_start)) in starts.iter().enumerate() {
            let body_end = starts.get(index + 1).map_or(text.len(), |&(next, _)| next);
            let body = text[body_start..body_end]
                .trim_start_matches(|c: char| matches!(c, ':' | ')' | '.' | '*' | '#') || c.is_whitespace());

            let question = self.parse_block(patterns, body, index, request);
            match question.defect() {
                None => questions.push(question),
                Some(defect) => debug!("丢弃第 {} 块: {}", index + 1, defect),
            }
        }

        non_empty(questions)
    }

    /// 策略 4：兜底题库，按请求题数生成
    pub fn fallback(&self, request: &GenerationRequest) -> Vec<Question> {
        let count = request.requested_question_count.max(1) as usize;
        (0..count)
            .map(|i| {
                question_bank::fallback_question(&request.subject, &request.topic, i + 1, request.type_for(i))
            })
            .collect()
    }

    fn finish(
        &self,
        strategy: Strategy,
        mut questions: Vec<Question>,
        request: &GenerationRequest,
    ) -> Normalized {
        if self.cap_to_requested {
            questions.truncate(request.requested_question_count.max(1) as usize);
        }
        ensure_unique_ids(&mut questions);
        info!("✓ 使用 {} 策略得到 {} 道题目", strategy, questions.len());
        Normalized {
            strategy,
            questions,
        }
    }

    // ========== 结构化映射 ==========

    fn map_items(&self, items: &[Value], request: &GenerationRequest) -> Option<Vec<Question>> {
        let mut questions = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match map_item(item, index, request) {
                Some(q) => match q.defect() {
                    None => questions.push(q),
                    Some(defect) => debug!("丢弃第 {} 题: {}", index + 1, defect),
                },
                None => debug!("第 {} 题缺少必要字段: {}", index + 1, truncate_text(&item.to_string(), 80)),
            }
        }
        non_empty(questions)
    }

    // ========== 自由文本 ==========

    fn parse_block(
        &self,
        patterns: &TextPatterns,
        body: &str,
        index: usize,
        request: &GenerationRequest,
    ) -> Question {
        let question_type = request.type_for(index);
        let number = index + 1;

        let options: Vec<String> = patterns
            .option
            .captures_iter(body)
            .filter_map(|c| c.get(2).map(|m| m.as_str().trim().to_string()))
            .collect();
        let first_option_at = patterns.option.find(body).map(|m| m.start());

        let prompt_end = [
            first_option_at,
            patterns.text_answer.find(body).map(|m| m.start()),
            patterns.explanation.find(body).map(|m| m.start()),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(body.len());
        let prompt = collapse_whitespace(&body[..prompt_end]);
        let prompt = if prompt.is_empty() {
            format!("Question {} from {}", number, request.topic)
        } else {
            prompt
        };

        let explanation = patterns
            .explanation
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default_explanation(&request.topic));

        match question_type {
            QuestionType::Mcq => {
                let distinct = dedup_preserving_order(options.clone());
                if distinct.len() < 2 {
                    debug!("第 {} 块不足两个不同选项，使用兜底题目", number);
                    return question_bank::fallback_question(
                        &request.subject,
                        &request.topic,
                        number,
                        question_type,
                    );
                }

                let search_from = first_option_at.unwrap_or(0);
                let correct_answer = patterns
                    .choice_answer
                    .captures(&body[search_from..])
                    .and_then(|c| c.get(1))
                    .and_then(|m| letter_offset(m.as_str()))
                    .and_then(|offset| options.get(offset))
                    .unwrap_or(&distinct[0])
                    .clone();

                Question {
                    id: format!("q_{}", number),
                    question_type,
                    prompt,
                    options: Some(distinct),
                    correct_answer,
                    explanation,
                }
            }
            QuestionType::Text => {
                let correct_answer = patterns
                    .text_answer
                    .captures(body)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| format!("Sample answer for {}", request.topic));

                Question {
                    id: format!("q_{}", number),
                    question_type,
                    prompt,
                    options: None,
                    correct_answer,
                    explanation,
                }
            }
        }
    }
}

impl Default for ContentNormalizer {
    fn default() -> Self {
        Self::new(false)
    }
}

// ========== 辅助函数 ==========

/// 对象没有 `questions` 但有 `result` 时，取 `result`
fn unwrap_result(raw: &Value) -> &Value {
    match raw {
        Value::Object(map) if !map.contains_key("questions") => map.get("result").unwrap_or(raw),
        _ => raw,
    }
}

fn questions_array(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Object(map) => map.get("questions")?.as_array(),
        Value::Array(items) => Some(items),
        _ => None,
    }
}

fn map_item(item: &Value, index: usize, request: &GenerationRequest) -> Option<Question> {
    let obj = item.as_object()?;

    let question_type = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(QuestionType::parse_loose)
        .unwrap_or_else(|| request.type_for(index));

    let prompt = first_text(obj, &["question", "prompt", "text"])?;

    let id = obj
        .get("id")
        .and_then(scalar_text)
        .unwrap_or_else(|| format!("q_{}", index + 1));

    let raw_answer = ["correct_answer", "correctAnswer", "answer"]
        .iter()
        .find_map(|key| obj.get(*key))?;

    let (options, correct_answer) = match question_type {
        QuestionType::Mcq => {
            let options = option_list(obj.get("options")?);
            let answer = resolve_choice(raw_answer, &options)?;
            (Some(options), answer)
        }
        QuestionType::Text => (None, scalar_text(raw_answer)?),
    };

    let explanation =
        first_text(obj, &["explanation"]).unwrap_or_else(|| default_explanation(&request.topic));

    Some(Question {
        id,
        question_type,
        prompt,
        options,
        correct_answer,
        explanation,
    })
}

/// 第一个非空的文本字段
fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .filter_map(scalar_text)
        .next()
}

/// 字符串、数字、布尔值转成去掉首尾空白的非空文本
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// 选项既可能是数组，也可能是 `{"A": "...", "B": "..."}`
fn option_list(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            entries.into_iter().filter_map(|(_, v)| scalar_text(v)).collect()
        }
        _ => Vec::new(),
    };
    dedup_preserving_order(raw)
}

/// 把上游给出的答案对应到选项文本
///
/// 依次尝试：原文匹配、字母（`B`）、`B) 文本` 形式、数字下标
fn resolve_choice(raw: &Value, options: &[String]) -> Option<String> {
    match raw {
        Value::String(s) => {
            let answer = s.trim();
            if options.iter().any(|o| o == answer) {
                return Some(answer.to_string());
            }
            if let Some(option) = letter_offset(answer).and_then(|i| options.get(i)) {
                return Some(option.clone());
            }
            let mut chars = answer.chars();
            if let (Some(letter), Some(')' | '.')) = (chars.next(), chars.next()) {
                let rest = chars.as_str().trim();
                if options.iter().any(|o| o == rest) {
                    return Some(rest.to_string());
                }
                if let Some(option) = letter_offset(&letter.to_string()).and_then(|i| options.get(i)) {
                    return Some(option.clone());
                }
            }
            Some(answer.to_string())
        }
        Value::Number(n) => {
            let literal = n.to_string();
            if options.contains(&literal) {
                return Some(literal);
            }
            n.as_u64()
                .and_then(|i| options.get(i as usize))
                .cloned()
        }
        _ => None,
    }
}

/// `A` -> 0，`b` -> 1，其余返回 None
fn letter_offset(letter: &str) -> Option<usize> {
    let mut chars = letter.chars();
    let c = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !c.is_ascii_uppercase() {
        return None;
    }
    Some((c as u8 - b'A') as usize)
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|s| seen.insert(s.clone())).collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn default_explanation(topic: &str) -> String {
    format!("This question tests your understanding of {}.", topic)
}

fn non_empty(questions: Vec<Question>) -> Option<Vec<Question>> {
    (!questions.is_empty()).then_some(questions)
}

/// 重复的 ID 改写为 `q_<序号>`
fn ensure_unique_ids(questions: &mut [Question]) {
    let mut seen = HashSet::new();
    for (index, question) in questions.iter_mut().enumerate() {
        if seen.insert(question.id.clone()) {
            continue;
        }
        let mut candidate = format!("q_{}", index + 1);
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("q_{}_{}", index + 1, suffix);
            suffix += 1;
        }
        debug!("题目ID {} 重复，改为 {}", question.id, candidate);
        seen.insert(candidate.clone());
        question.id = candidate;
    }
}
