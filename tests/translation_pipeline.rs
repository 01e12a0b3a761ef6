//! 翻译流程集成测试
//!
//! 使用模拟API与临时SQLite文件，验证缓存优先的完整翻译流程

use polywoof::translation::{LanguageOrigin, StoreState};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{TestEnvironment, STANDARD_LANGUAGES};

/// 首次翻译请求API并写入缓存，第二次直接命中缓存
#[tokio::test]
async fn test_end_to_end_cache_aside() {
    let env = TestEnvironment::new().await;
    let languages = env.mock_languages(STANDARD_LANGUAGES);
    let translate = env.mock_translate(&["Привет"]);

    let service = env.service("secret:fx");
    service.start().await;
    languages.assert_hits(1);

    let first = service.translate("Hello", "RU").await.unwrap();
    assert_eq!(first.as_deref(), Some("Привет"));
    translate.assert_hits(1);

    let second = service.translate("Hello", "russian").await.unwrap();
    assert_eq!(second.as_deref(), Some("Привет"));
    translate.assert_hits(1);

    let stats = service.stats();
    assert_eq!(stats.remote_calls, 1);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);

    service.shutdown().await;
    assert_eq!(env.read_cell("Hello", "RU").as_deref(), Some("Привет"));
    assert_eq!(env.read_cell("Hello", "DE"), None);
    assert_eq!(env.row_count(), 1);
}

/// 缓存在进程重启后仍然有效
#[tokio::test]
async fn test_cache_survives_restart() {
    let env = TestEnvironment::new().await;
    env.mock_languages(STANDARD_LANGUAGES);
    let translate = env.mock_translate(&["Bonjour"]);

    let service = env.service("secret");
    service.start().await;
    service.translate("Hello", "fr").await.unwrap();
    service.shutdown().await;

    let restarted = env.service("secret");
    restarted.start().await;
    let cached = restarted.translate("Hello", "french").await.unwrap();
    assert_eq!(cached.as_deref(), Some("Bonjour"));
    translate.assert_hits(1);
    restarted.shutdown().await;
}

/// 未知语言不会发出请求，也不会写入任何行
#[tokio::test]
async fn test_unknown_language_is_silent() {
    let env = TestEnvironment::new().await;
    env.mock_languages(STANDARD_LANGUAGES);
    let translate = env.mock_translate(&["???"]);

    let service = env.service("secret");
    service.start().await;

    assert_eq!(service.translate("Hello", "zz-nonexistent").await, Ok(None));
    translate.assert_hits(0);
    assert_eq!(service.stats().skipped, 1);

    service.shutdown().await;
    assert_eq!(env.row_count(), 0);
}

/// 在线列表加载后优先返回可信语言
#[tokio::test]
async fn test_resolution_prefers_trusted_after_refresh() {
    let env = TestEnvironment::new().await;
    env.mock_languages(&[("RU", "Russian")]);

    let service = env.service("secret");
    assert_eq!(service.resolve("ru").origin, LanguageOrigin::Offline);

    service.refresh_languages().await.unwrap();
    let language = service.resolve("ru");
    assert_eq!(language.code, "RU");
    assert_eq!(language.origin, LanguageOrigin::Trusted);
}

/// 缓存无法打开时仍然可以翻译
#[tokio::test]
async fn test_translation_bypasses_broken_cache() {
    let env = TestEnvironment::new().await;
    env.mock_languages(STANDARD_LANGUAGES);
    let translate = env.mock_translate(&["Hallo"]);

    // 把数据库路径占用为目录，打开必然失败
    std::fs::create_dir_all(env.db_path()).unwrap();

    let service = env.service("secret");
    service.start().await;
    assert_eq!(service.cache().unwrap().state(), StoreState::Closed);

    assert_eq!(
        service.translate("Hello", "de").await.unwrap().as_deref(),
        Some("Hallo")
    );
    assert_eq!(
        service.translate("Hello", "de").await.unwrap().as_deref(),
        Some("Hallo")
    );
    translate.assert_hits(2);
}

/// 未启用缓存时每次都请求API
#[tokio::test]
async fn test_without_cache_always_calls_remote() {
    let env = TestEnvironment::new().await;
    env.mock_languages(STANDARD_LANGUAGES);
    let translate = env.mock_translate(&["Привет"]);

    let service = polywoof::TranslationService::with_cache_config(env.config("secret"), None)
        .expect("service");
    service.start().await;

    service.translate("Hello", "ru").await.unwrap();
    service.translate("Hello", "ru").await.unwrap();
    translate.assert_hits(2);
    assert!(service.cache_stats().is_none());
}

/// 回调形式在后台完成翻译
#[tokio::test]
async fn test_translate_with_callback() {
    let env = TestEnvironment::new().await;
    env.mock_languages(STANDARD_LANGUAGES);
    env.mock_translate(&["Привет, ", "мир"]);

    let service = env.service("secret");
    service.start().await;

    let (tx, rx) = tokio::sync::oneshot::channel();
    let handle = service.translate_with("Hello, world", "ru", move |text| {
        let _ = tx.send(text);
    });

    assert_eq!(rx.await.unwrap(), "Привет, мир");
    handle.await.unwrap();
}
