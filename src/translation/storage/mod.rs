//! 存储模块
//!
//! 基于SQLite的持久化翻译缓存。

pub mod cache;

pub use cache::{
    CacheConfig, CacheLocation, CacheStats, CacheStatsSnapshot, PersistentCache, StoreState,
    MAX_SOURCE_LENGTH,
};
