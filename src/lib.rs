//! # Polywoof Library
//!
//! 为频繁重复的短文本（游戏对话、物品描述、界面选项）提供带持久化缓存的DeepL翻译。
//!
//! ## 模块组织
//!
//! - `env` - 类型安全的环境变量
//! - `translation` - 语言解析、翻译缓存与API客户端

pub mod env;
pub mod translation;

pub use translation::{
    Language, TranslationConfig, TranslationError, TranslationResult, TranslationService,
};
