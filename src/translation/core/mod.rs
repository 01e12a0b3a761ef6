//! 翻译系统核心模块
//!
//! - **服务层** (`service.rs`): 缓存优先的翻译流程，协调语言表、缓存和客户端
//! - **客户端** (`client.rs`): DeepL v2 API的请求构造、状态码映射和响应解析
//!
//! ```text
//! TranslationService (service.rs)
//!     ├── LanguageTable (language.rs)
//!     ├── PersistentCache (storage/cache.rs)
//!     └── TranslationClient (client.rs)
//! ```

pub mod client;
pub mod service;

pub use client::{endpoint_for, LanguageKind, TranslationClient, Usage};
pub use service::{ServiceStats, ServiceStatsSnapshot, TranslationService};
