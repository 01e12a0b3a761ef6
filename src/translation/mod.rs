//! 翻译模块
//!
//! 面向短文本的缓存优先翻译管道：
//! - **config**: 配置管理
//! - **core**: API客户端与翻译服务
//! - **error**: 错误处理
//! - **language**: 语言表与输入解析
//! - **pipeline**: 文本过滤（去除标记、实体解码、消息规则）
//! - **storage**: 基于SQLite的持久化缓存
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use polywoof::translation::{ConfigManager, TranslationService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::new()?.into_config();
//! let service = TranslationService::new(config)?;
//! service.start().await;
//!
//! let translated = service.translate("Hello", "ru").await?;
//! # Ok(())
//! # }
//! ```

/// 配置管理模块
pub mod config;

/// 核心模块 - API客户端与翻译服务
pub mod core;

/// 错误处理模块
pub mod error;

/// 语言表模块
pub mod language;

/// 文本处理管道模块
pub mod pipeline;

/// 存储管理模块
pub mod storage;

// ============================================================================
// 公共API导出
// ============================================================================

pub use config::{ConfigManager, TranslationConfig};
pub use core::{
    LanguageKind, ServiceStats, ServiceStatsSnapshot, TranslationClient, TranslationService, Usage,
};
pub use error::{
    ConfigError, ErrorSeverity, RemoteError, StoreError, TranslationError, TranslationResult,
};
pub use language::{Language, LanguageOrigin, LanguageTable};
pub use pipeline::{strip_markup, unescape_html, MessageFilter, ParsePattern};
pub use storage::{CacheConfig, CacheLocation, PersistentCache, StoreState};
