//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量读取，所有变量以 `POLYWOOF_` 为前缀

use std::env;
use std::fmt;
use std::time::Duration;

use crate::translation::storage::cache::is_valid_table_name;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "POLYWOOF_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 翻译功能启用状态
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "POLYWOOF_ENABLED";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Enable translation functionality";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// API密钥，未设置时回退到 `DEEPL_AUTH_KEY`
    pub struct Token;

    impl Token {
        pub const FALLBACK_NAME: &'static str = "DEEPL_AUTH_KEY";
    }

    impl EnvVar<String> for Token {
        const NAME: &'static str = "POLYWOOF_TOKEN";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str =
            "DeepL authentication key (falls back to DEEPL_AUTH_KEY); keys ending in ':fx' use the free API host";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME).or_else(|_| env::var(Self::FALLBACK_NAME)) {
                Ok(value) => Self::parse(&value),
                Err(_) => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Required environment variable not set".to_string(),
                }),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            let token = value.trim();
            if token.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Token must not be empty".to_string(),
                });
            }
            Ok(token.to_string())
        }
    }

    /// 默认目标语言（代码或名称前缀）
    pub struct Language;
    impl EnvVar<String> for Language {
        const NAME: &'static str = "POLYWOOF_LANGUAGE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str =
            "Default target language, as a code (RU) or a name prefix (russ)";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("RU".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim();
            if lang.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Language must not be empty".to_string(),
                });
            }
            Ok(lang.to_string())
        }
    }

    /// API地址覆盖
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "POLYWOOF_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str =
            "Override the API base URL (default: derived from the token suffix)";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 请求超时
    pub struct Timeout;
    impl EnvVar<Duration> for Timeout {
        const NAME: &'static str = "POLYWOOF_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(10));
        const DESCRIPTION: &'static str = "HTTP request timeout in seconds (1-300)";

        fn parse(value: &str) -> EnvResult<Duration> {
            let secs = parse_positive_usize(value, Self::NAME, 1, 300)?;
            Ok(Duration::from_secs(secs as u64))
        }
    }
}

/// 缓存相关环境变量
pub mod cache {
    use super::*;

    /// 缓存启用状态
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "POLYWOOF_CACHE_ENABLED";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Enable the on-disk translation cache";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 缓存文件路径
    pub struct Path;
    impl EnvVar<String> for Path {
        const NAME: &'static str = "POLYWOOF_CACHE_PATH";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "SQLite cache file path ('~' is expanded)";

        fn parse(value: &str) -> EnvResult<String> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
            Ok(shellexpand::tilde(path).into_owned())
        }
    }

    /// 缓存表名
    pub struct Table;
    impl EnvVar<String> for Table {
        const NAME: &'static str = "POLYWOOF_CACHE_TABLE";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Cache table name, one table per logical cache";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("DEEPL".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            let table = value.trim();
            if is_valid_table_name(table) {
                Ok(table.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("Invalid table name '{}'", value),
                })
            }
        }
    }
}

fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!(
                "Invalid boolean value '{}'. Use: true/false, 1/0, yes/no, on/off, enabled/disabled",
                value
            ),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

fn doc_line<T: fmt::Debug>(name: &str, description: &str, default: Option<T>) -> String {
    format!("- `{}`: {} (default: {:?})\n", name, description, default)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    use translation::Token;

    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    docs.push_str(&doc_line(
        core::LogLevel::NAME,
        core::LogLevel::DESCRIPTION,
        Some("info"),
    ));

    docs.push_str("\n## Translation Configuration\n\n");
    docs.push_str(&doc_line(
        translation::Enabled::NAME,
        translation::Enabled::DESCRIPTION,
        translation::Enabled::DEFAULT,
    ));
    docs.push_str(&doc_line(Token::NAME, Token::DESCRIPTION, Token::DEFAULT));
    docs.push_str(&doc_line(
        Token::FALLBACK_NAME,
        "Fallback for POLYWOOF_TOKEN",
        None::<String>,
    ));
    docs.push_str(&doc_line(
        translation::Language::NAME,
        translation::Language::DESCRIPTION,
        Some("RU"),
    ));
    docs.push_str(&doc_line(
        translation::ApiUrl::NAME,
        translation::ApiUrl::DESCRIPTION,
        translation::ApiUrl::DEFAULT,
    ));
    docs.push_str(&doc_line(
        translation::Timeout::NAME,
        translation::Timeout::DESCRIPTION,
        translation::Timeout::DEFAULT,
    ));

    docs.push_str("\n## Cache Configuration\n\n");
    docs.push_str(&doc_line(
        cache::Enabled::NAME,
        cache::Enabled::DESCRIPTION,
        cache::Enabled::DEFAULT,
    ));
    docs.push_str(&doc_line(
        cache::Path::NAME,
        cache::Path::DESCRIPTION,
        cache::Path::DEFAULT,
    ));
    docs.push_str(&doc_line(
        cache::Table::NAME,
        cache::Table::DESCRIPTION,
        Some("DEEPL"),
    ));

    docs
}
