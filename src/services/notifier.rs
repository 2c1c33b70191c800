//! 通知服务 - 业务能力层
//!
//! 只负责"把一条提示发给用户"的能力，不关心流程。
//! 通知失败永远不会影响调用方。

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NotifyLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NotifyLevel::Info => "info",
            NotifyLevel::Success => "success",
            NotifyLevel::Warning => "warning",
            NotifyLevel::Error => "error",
        }
    }
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一条通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
}

/// 通知出口
pub trait NotificationSink: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

/// 写入 tracing 日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => info!("🔔 {}", message),
            NotifyLevel::Success => info!("✅ {}", message),
            NotifyLevel::Warning => warn!("⚠️ {}", message),
            NotifyLevel::Error => error!("❌ {}", message),
        }
    }
}

/// 追加写入通知文件
///
/// 职责：
/// - 每条通知一行，带时间和级别
/// - 写入失败只记录日志
pub struct FileNotifier {
    file_path: String,
}

impl FileNotifier {
    /// 使用默认文件 notifications.txt
    pub fn new() -> Self {
        Self::with_path("notifications.txt")
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.file_path
    }

    fn append(&self, level: NotifyLevel, message: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        let line = format!(
            "{} | {} | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            message
        );
        file.write_all(line.as_bytes())
    }
}

impl Default for FileNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for FileNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        debug!("写入通知: [{}] {}", level, message);
        if let Err(e) = self.append(level, message) {
            warn!("⚠️ 写入通知文件失败 ({}): {}", self.file_path, e);
        }
    }
}

/// 把通知保存在内存里，供测试和上层读取
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 到目前为止收到的所有通知
    pub fn entries(&self) -> Vec<Notification> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|n| n.message).collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        let entry = Notification {
            level,
            message: message.to_string(),
        };
        match self.entries.lock() {
            Ok(mut guard) => guard.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

/// 同时发给多个出口
#[derive(Default)]
pub struct FanoutNotifier {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl NotificationSink for FanoutNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        for sink in &self.sinks {
            sink.notify(level, message);
        }
    }
}
