//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslationConfig};

/// 配置常量
pub mod constants {
    // 默认API设置
    pub const FREE_API_URL: &str = "https://api-free.deepl.com";
    pub const PRO_API_URL: &str = "https://api.deepl.com";
    pub const FREE_KEY_SUFFIX: &str = ":fx";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_USER_AGENT: &str = concat!("polywoof/", env!("CARGO_PKG_VERSION"));

    // 语言
    pub const DEFAULT_LANGUAGE: &str = "RU";
    pub const SOURCE_LANGUAGE: &str = "en";

    // 缓存设置
    pub const DEFAULT_CACHE_PATH: &str = "~/.cache/polywoof/translations.db";
    pub const DEFAULT_CACHE_TABLE: &str = "DEEPL";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "polywoof.toml",
        ".polywoof.toml",
        "~/.config/polywoof/config.toml",
        "/etc/polywoof/config.toml",
    ];

    // .env 文件，按顺序只加载第一个存在的
    pub const ENV_FILES: &[&str] = &[".env.local", ".env.development", ".env.production", ".env"];
}
