//! 翻译模块统一错误处理
//!
//! 错误分为三类：配置错误、远程API错误和本地缓存错误。
//! 远程错误由HTTP状态码映射而来，本层从不自动重试。

use thiserror::Error;

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 未配置API密钥，视为功能关闭
    #[error("未配置API密钥")]
    MissingCredential,

    /// 配置值无效
    #[error("配置无效: {0}")]
    Invalid(String),

    /// 读写配置文件失败
    #[error("配置文件读写失败: {0}")]
    Io(String),

    /// 配置文件解析失败
    #[error("配置解析失败: {0}")]
    Parse(String),
}

/// 远程翻译API错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("请求格式错误")]
    BadRequest,

    #[error("授权失败")]
    AuthFailed,

    #[error("请求的资源不存在")]
    NotFound,

    #[error("请求内容或URL超出限制")]
    TooLarge,

    #[error("请求过于频繁")]
    RateLimited,

    #[error("翻译额度已用尽")]
    QuotaExceeded,

    #[error("服务暂时不可用")]
    Unavailable,

    /// 未知状态码或无法解析的响应体
    #[error("内部错误: {0}")]
    Internal(String),

    /// 连接失败、超时等传输层错误
    #[error("网络错误: {0}")]
    Transport(String),
}

impl RemoteError {
    /// 将HTTP状态码映射为错误类型，成功状态返回 `None`
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            400 => Some(RemoteError::BadRequest),
            403 => Some(RemoteError::AuthFailed),
            404 => Some(RemoteError::NotFound),
            413 | 414 => Some(RemoteError::TooLarge),
            429 => Some(RemoteError::RateLimited),
            456 => Some(RemoteError::QuotaExceeded),
            503 => Some(RemoteError::Unavailable),
            other => Some(RemoteError::Internal(format!("HTTP状态码 {}", other))),
        }
    }
}

/// 本地持久化缓存错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("缓存尚未打开")]
    NotOpen,

    #[error("打开缓存失败: {0}")]
    OpenFailed(String),

    #[error("写入缓存失败: {0}")]
    WriteFailed(String),

    /// 该语言的列尚未创建
    #[error("缓存中不存在语言列: {0}")]
    MissingColumn(String),
}

/// 翻译错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TranslationError {
    /// 检查错误是否值得调用方稍后重试（本库自身从不重试）
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::Remote(RemoteError::RateLimited) => true,
            TranslationError::Remote(RemoteError::Unavailable) => true,
            TranslationError::Remote(RemoteError::Transport(_)) => true,
            TranslationError::Remote(_) => false,
            TranslationError::Store(StoreError::NotOpen) => true,
            TranslationError::Store(_) => false,
            TranslationError::Config(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::Config(ConfigError::MissingCredential) => ErrorSeverity::Info,
            TranslationError::Config(_) => ErrorSeverity::Critical,
            TranslationError::Remote(RemoteError::AuthFailed) => ErrorSeverity::Critical,
            TranslationError::Remote(RemoteError::QuotaExceeded) => ErrorSeverity::Error,
            TranslationError::Remote(RemoteError::Internal(_)) => ErrorSeverity::Error,
            TranslationError::Remote(_) => ErrorSeverity::Warning,
            TranslationError::Store(StoreError::NotOpen) => ErrorSeverity::Info,
            TranslationError::Store(StoreError::MissingColumn(_)) => ErrorSeverity::Info,
            TranslationError::Store(_) => ErrorSeverity::Warning,
        }
    }

    /// 是否为“功能未启用”这类应当静默处理的情况
    pub fn is_disabled(&self) -> bool {
        matches!(self, TranslationError::Config(ConfigError::MissingCredential))
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        ConfigError::Io(error.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(error: toml::de::Error) -> Self {
        ConfigError::Parse(format!("TOML解析错误: {}", error))
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(error: serde_json::Error) -> Self {
        RemoteError::Internal(format!("JSON解析错误: {}", error))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            RemoteError::Transport(format!("请求超时: {}", error))
        } else {
            RemoteError::Transport(error.to_string())
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::WriteFailed(error.to_string())
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 缓存操作结果类型别名
pub type StoreResult<T> = Result<T, StoreError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(context: &str, error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::debug!("{}: {}", context, error),
            ErrorSeverity::Warning => tracing::warn!("{}: {}", context, error),
            ErrorSeverity::Error => tracing::error!("{}: {}", context, error),
            ErrorSeverity::Critical => tracing::error!("{} (严重): {}", context, error),
        }
    }}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RemoteError::from_status(200), None);
        assert_eq!(RemoteError::from_status(400), Some(RemoteError::BadRequest));
        assert_eq!(RemoteError::from_status(403), Some(RemoteError::AuthFailed));
        assert_eq!(RemoteError::from_status(404), Some(RemoteError::NotFound));
        assert_eq!(RemoteError::from_status(413), Some(RemoteError::TooLarge));
        assert_eq!(RemoteError::from_status(414), Some(RemoteError::TooLarge));
        assert_eq!(RemoteError::from_status(429), Some(RemoteError::RateLimited));
        assert_eq!(RemoteError::from_status(456), Some(RemoteError::QuotaExceeded));
        assert_eq!(RemoteError::from_status(503), Some(RemoteError::Unavailable));
        assert!(matches!(
            RemoteError::from_status(500),
            Some(RemoteError::Internal(_))
        ));
    }

    #[test]
    fn test_missing_credential_is_silent() {
        let error = TranslationError::from(ConfigError::MissingCredential);
        assert!(error.is_disabled());
        assert_eq!(error.severity(), ErrorSeverity::Info);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TranslationError::from(RemoteError::RateLimited).is_retryable());
        assert!(!TranslationError::from(RemoteError::QuotaExceeded).is_retryable());
        assert!(!TranslationError::from(StoreError::WriteFailed("x".into())).is_retryable());
    }
}
