// 集成测试公共模块
//
// 提供测试辅助工具和共享功能

use std::path::PathBuf;

use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::json;
use tempfile::TempDir;

use polywoof::translation::{
    CacheConfig, CacheLocation, PersistentCache, TranslationConfig, TranslationService,
};

pub const TABLE: &str = "DEEPL";

/// 测试环境：模拟API服务器加临时缓存目录
pub struct TestEnvironment {
    pub server: MockServer,
    pub dir: TempDir,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start_async().await,
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("cache").join("translations.db")
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            location: CacheLocation::File(self.db_path()),
            table: TABLE.to_string(),
        }
    }

    pub fn config(&self, token: &str) -> TranslationConfig {
        let mut config = TranslationConfig::with_token(token);
        config.api_url = Some(self.server.base_url());
        config.cache_path = self.db_path().to_string_lossy().into_owned();
        config
    }

    /// 创建服务，缓存文件位于临时目录
    pub fn service(&self, token: &str) -> TranslationService {
        TranslationService::with_cache_config(self.config(token), Some(self.cache_config()))
            .expect("service")
    }

    pub fn cache(&self) -> PersistentCache {
        PersistentCache::new(self.cache_config()).expect("cache")
    }

    pub fn mock_languages(&self, languages: &[(&str, &str)]) -> Mock<'_> {
        let body: Vec<_> = languages
            .iter()
            .map(|(code, name)| json!({"language": code, "name": name}))
            .collect();

        self.server.mock(|when, then| {
            when.method(POST).path("/v2/languages");
            then.status(200).json_body(json!(body));
        })
    }

    pub fn mock_translate(&self, segments: &[&str]) -> Mock<'_> {
        let translations: Vec<_> = segments
            .iter()
            .map(|text| json!({"detected_source_language": "EN", "text": text}))
            .collect();

        self.server.mock(|when, then| {
            when.method(POST).path("/v2/translate");
            then.status(200)
                .json_body(json!({ "translations": translations }));
        })
    }

    pub fn mock_translate_status(&self, status: u16) -> Mock<'_> {
        self.server.mock(|when, then| {
            when.method(POST).path("/v2/translate");
            then.status(status);
        })
    }

    /// 直接读取缓存文件中的一个单元格
    pub fn read_cell(&self, source: &str, code: &str) -> Option<String> {
        let connection = rusqlite::Connection::open(self.db_path()).expect("open db");
        connection
            .query_row(
                &format!("SELECT \"{}\" FROM \"{}\" WHERE source = ?1", code, TABLE),
                [source],
                |row| row.get::<_, Option<String>>(0),
            )
            .ok()
            .flatten()
    }

    pub fn row_count(&self) -> i64 {
        let connection = rusqlite::Connection::open(self.db_path()).expect("open db");
        connection
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", TABLE), [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }
}

pub const STANDARD_LANGUAGES: &[(&str, &str)] = &[
    ("DE", "German"),
    ("FR", "French"),
    ("RU", "Russian"),
];
