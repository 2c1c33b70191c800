use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 考试会话使用错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 试卷生成错误
    #[error("生成错误: {0}")]
    Generation(#[from] GenerationError),
    /// 持久化错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 考试会话错误
///
/// 只影响本次调用，不影响会话本身
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// 试卷不满足开考条件
    #[error("试卷无效: {reason}")]
    InvalidExam { reason: String },
    /// 会话已结束
    #[error("会话已结束，无法继续操作")]
    SessionNotActive,
    /// 题目索引超出范围
    #[error("题目索引 {index} 超出范围 (共 {len} 题)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// 试卷生成错误
///
/// 与会话错误区分：表示"没有得到可用的试卷"
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// 请求参数不完整
    #[error("请求无效: {reason}")]
    InvalidRequest { reason: String },
    /// 上游生成服务失败
    #[error("上游生成失败: {message}")]
    Upstream { message: String },
    /// 规范化后没有任何题目
    #[error("没有生成任何可用题目")]
    NoQuestions,
}

/// 持久化错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 编解码失败
    #[error("JSON解析失败 ({path}): {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl SessionError {
    pub fn invalid_exam(reason: impl Into<String>) -> Self {
        SessionError::InvalidExam {
            reason: reason.into(),
        }
    }
}

impl GenerationError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        GenerationError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// 包装上游错误，保留完整错误链
    pub fn upstream(err: &anyhow::Error) -> Self {
        GenerationError::Upstream {
            message: format!("{:#}", err),
        }
    }
}

impl StoreError {
    pub fn read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::ReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::WriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<String>, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
