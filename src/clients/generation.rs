//! 出题客户端
//!
//! 封装"把出题请求交给上游并拿回原始内容"的调用，
//! 上游返回什么形状都原样交给规范化服务处理。

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::models::GenerationRequest;
use crate::utils::logging::truncate_text;

/// 上游返回的信封：`{ success, result }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationEnvelope {
    pub success: bool,
    #[serde(default)]
    pub result: Value,
}

impl GenerationEnvelope {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result,
        }
    }

    pub fn refused() -> Self {
        Self {
            success: false,
            result: Value::Null,
        }
    }

    /// 从任意 JSON 推断信封
    ///
    /// 带 `success` 字段的对象按信封解析，其余整体视为 `result`
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) if map.contains_key("success") => {
                let success = map.get("success").and_then(Value::as_bool).unwrap_or(false);
                let result = map.remove("result").unwrap_or(Value::Null);
                Self { success, result }
            }
            other => Self::ok(other),
        }
    }
}

/// 出题服务
pub trait ExamGenerator: Send + Sync {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<GenerationEnvelope>>;
}

/// 固定返回同一份内容
#[derive(Debug, Clone)]
pub struct StaticGenerator {
    envelope: GenerationEnvelope,
}

impl StaticGenerator {
    pub fn new(envelope: GenerationEnvelope) -> Self {
        Self { envelope }
    }

    /// 成功返回给定的 `result`
    pub fn with_result(result: Value) -> Self {
        Self::new(GenerationEnvelope::ok(result))
    }
}

impl ExamGenerator for StaticGenerator {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<GenerationEnvelope>> {
        Box::pin(async move {
            debug!("StaticGenerator: {} / {}", request.subject, request.topic);
            Ok(self.envelope.clone())
        })
    }
}

/// 从磁盘读取上游返回
///
/// 文件可以是 JSON 信封、任意 JSON，或者模型输出的纯文本
#[derive(Debug, Clone)]
pub struct PayloadFileGenerator {
    path: PathBuf,
}

impl PayloadFileGenerator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ExamGenerator for PayloadFileGenerator {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<GenerationEnvelope>> {
        Box::pin(async move {
            info!(
                "📂 读取上游内容: {} (科目: {}, 主题: {})",
                self.path.display(),
                request.subject,
                request.topic
            );

            let text = tokio::fs::read_to_string(&self.path)
                .await
                .with_context(|| format!("读取上游内容失败: {}", self.path.display()))?;
            debug!("上游内容预览: {}", truncate_text(&text, 120));

            let envelope = match serde_json::from_str::<Value>(&text) {
                Ok(value) => GenerationEnvelope::from_value(value),
                Err(_) => GenerationEnvelope::ok(Value::String(text)),
            };
            Ok(envelope)
        })
    }
}
