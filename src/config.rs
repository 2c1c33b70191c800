use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::Difficulty;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 持久化使用的用户标识
    pub user_id: String,
    /// JSON 存储目录
    pub data_dir: String,
    /// 通知日志文件
    pub notification_log_file: String,
    /// 倒计时节拍间隔（毫秒）
    pub tick_interval_ms: u64,
    /// 是否把解析结果截断到请求题数
    pub cap_to_requested: bool,
    // --- 出题默认值 ---
    pub default_question_count: u32,
    pub default_time_limit_minutes: u32,
    pub default_difficulty: Difficulty,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "demo-user".to_string(),
            data_dir: "exam_data".to_string(),
            notification_log_file: "notifications.txt".to_string(),
            tick_interval_ms: 1000,
            cap_to_requested: false,
            default_question_count: 10,
            default_time_limit_minutes: 30,
            default_difficulty: Difficulty::Intermediate,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量覆盖，解析失败的变量保留默认值
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 配置文件（存在时）再叠加环境变量
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) if p.exists() => Self::from_toml_file(p)?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        Self {
            user_id: std::env::var("EXAM_USER_ID").unwrap_or(self.user_id),
            data_dir: std::env::var("EXAM_DATA_DIR").unwrap_or(self.data_dir),
            notification_log_file: std::env::var("NOTIFICATION_LOG_FILE").unwrap_or(self.notification_log_file),
            tick_interval_ms: env_parse("TICK_INTERVAL_MS").unwrap_or(self.tick_interval_ms),
            cap_to_requested: env_parse("CAP_TO_REQUESTED").unwrap_or(self.cap_to_requested),
            default_question_count: env_parse("DEFAULT_QUESTION_COUNT").unwrap_or(self.default_question_count),
            default_time_limit_minutes: env_parse("DEFAULT_TIME_LIMIT_MINUTES").unwrap_or(self.default_time_limit_minutes),
            default_difficulty: env_parse("DEFAULT_DIFFICULTY").unwrap_or(self.default_difficulty),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str) -> Option<T> {
    let value = std::env::var(var_name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            let err = ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            };
            tracing::warn!("⚠️ {}，使用默认值", err);
            None
        }
    }
}
