//! 缓存系统集成测试
//!
//! 测试SQLite持久化缓存的生命周期、模式演进与写入顺序

use polywoof::translation::{Language, StoreError, StoreState};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::TestEnvironment;

fn russian() -> Language {
    Language::trusted("RU", "Russian")
}

/// 打开前的所有操作都是空操作，不会阻塞
#[tokio::test]
async fn test_operations_before_open_are_noops() {
    let env = TestEnvironment::new().await;
    let cache = env.cache();

    assert_eq!(cache.state(), StoreState::Closed);
    assert_eq!(cache.get("Hello", &russian()).await, None);
    assert_eq!(
        cache.put("Hello", &russian(), "Привет").await,
        Err(StoreError::NotOpen)
    );
    assert_eq!(cache.len().await, Err(StoreError::NotOpen));
    assert!(!env.db_path().exists());
}

/// 打开时创建父目录和基础表
#[tokio::test]
async fn test_open_creates_file_and_table() {
    let env = TestEnvironment::new().await;
    let cache = env.cache();

    cache.open().await.expect("open");
    assert!(env.db_path().exists());
    assert!(cache.columns().await.is_empty());
    assert_eq!(cache.len().await, Ok(0));
    cache.close().await;

    assert_eq!(env.row_count(), 0);
}

/// 必须先有语言列才能写入
#[tokio::test]
async fn test_schema_before_write() {
    let env = TestEnvironment::new().await;
    let cache = env.cache();
    cache.open().await.unwrap();

    assert_eq!(
        cache.put("Hello", &russian(), "Привет").await,
        Err(StoreError::MissingColumn("RU".to_string()))
    );
    assert_eq!(cache.get("Hello", &russian()).await, None);

    assert_eq!(cache.ensure_columns(&[russian()]).await, Ok(1));
    assert_eq!(cache.put("Hello", &russian(), "Привет").await, Ok(()));
    assert_eq!(
        cache.get("Hello", &russian()).await.as_deref(),
        Some("Привет")
    );

    cache.close().await;
    assert_eq!(env.read_cell("Hello", "RU").as_deref(), Some("Привет"));
}

/// 重新打开后已有的语言列会被识别，不会重复添加
#[tokio::test]
async fn test_columns_persist_across_reopen() {
    let env = TestEnvironment::new().await;
    let german = Language::trusted("DE", "German");

    let cache = env.cache();
    cache.open().await.unwrap();
    assert_eq!(cache.ensure_columns(&[russian(), german.clone()]).await, Ok(2));
    cache.put("Hello", &german, "Hallo").await.unwrap();
    cache.close().await;

    let reopened = env.cache();
    reopened.open().await.unwrap();
    assert_eq!(reopened.ensure_columns(&[russian(), german.clone()]).await, Ok(0));
    assert_eq!(
        reopened.get("Hello", &german).await.as_deref(),
        Some("Hallo")
    );
    reopened.close().await;
}

/// 同一主键重复写入时保留最后一次的值
#[tokio::test]
async fn test_last_write_wins() {
    let env = TestEnvironment::new().await;
    let cache = env.cache();
    cache.open().await.unwrap();
    cache.ensure_columns(&[russian()]).await.unwrap();

    for i in 0..20 {
        cache
            .put("Counter", &russian(), &i.to_string())
            .await
            .unwrap();
    }

    assert_eq!(cache.get("Counter", &russian()).await.as_deref(), Some("19"));
    assert_eq!(cache.len().await, Ok(1));
    cache.close().await;
}

/// 关闭后所有操作恢复为空操作
#[tokio::test]
async fn test_close_is_terminal_until_reopen() {
    let env = TestEnvironment::new().await;
    let cache = env.cache();
    cache.open().await.unwrap();
    cache.ensure_columns(&[russian()]).await.unwrap();
    cache.put("Hello", &russian(), "Привет").await.unwrap();

    cache.close().await;
    assert_eq!(cache.state(), StoreState::Closed);
    assert_eq!(cache.get("Hello", &russian()).await, None);
    assert_eq!(
        cache.put("Bye", &russian(), "Пока").await,
        Err(StoreError::NotOpen)
    );
    assert_eq!(env.row_count(), 1);
}

/// 不同的表互不影响
#[tokio::test]
async fn test_separate_tables_are_isolated() {
    let env = TestEnvironment::new().await;
    let first = env.cache();
    let second = polywoof::translation::PersistentCache::new(
        polywoof::translation::CacheConfig {
            location: polywoof::translation::CacheLocation::File(env.db_path()),
            table: "OTHER".to_string(),
        },
    )
    .unwrap();

    first.open().await.unwrap();
    first.ensure_columns(&[russian()]).await.unwrap();
    first.put("Hello", &russian(), "Привет").await.unwrap();
    first.close().await;

    second.open().await.unwrap();
    assert!(second.columns().await.is_empty());
    assert_eq!(second.get("Hello", &russian()).await, None);
    second.close().await;
}
