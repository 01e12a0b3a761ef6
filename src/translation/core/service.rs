//! 翻译服务核心实现
//!
//! 组合语言表、持久化缓存和API客户端，对外提供：
//!
//! - `translate`: 先查缓存，未命中时请求API并回写缓存
//! - `refresh_languages`: 获取在线语言列表，替换可信列表并为缓存增加语言列
//! - `usage`: 查询额度使用情况
//!
//! 缓存故障不会阻塞翻译，API故障不会写入缓存。
//!
//! ## 使用示例
//!
//! ```no_run
//! use polywoof::translation::{TranslationConfig, TranslationService};
//!
//! # async fn run() -> polywoof::translation::TranslationResult<()> {
//! let service = TranslationService::new(TranslationConfig::with_token("key:fx"))?;
//! service.start().await;
//!
//! if let Some(text) = service.translate("Hello", "russian").await? {
//!     println!("{}", text);
//! }
//!
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::task::JoinHandle;

use super::client::{LanguageKind, TranslationClient, Usage};
use crate::translation::{
    config::TranslationConfig,
    error::{helpers::log_error, TranslationError, TranslationResult},
    language::{Language, LanguageTable},
    pipeline::strip_markup,
    storage::{CacheConfig, CacheStatsSnapshot, PersistentCache},
};

/// 统一的翻译服务
///
/// 可廉价克隆，所有克隆共享同一个客户端、语言表和缓存。
#[derive(Clone)]
pub struct TranslationService {
    client: Arc<TranslationClient>,
    languages: Arc<LanguageTable>,
    /// 配置关闭缓存或缓存无法创建时为 `None`
    cache: Option<PersistentCache>,
    stats: Arc<ServiceStats>,
    config: Arc<TranslationConfig>,
}

impl TranslationService {
    /// 根据配置创建服务，缓存文件位置取自配置
    pub fn new(config: TranslationConfig) -> TranslationResult<Self> {
        let cache_config = config.cache_enabled.then(|| config.cache_config());
        Self::with_cache_config(config, cache_config)
    }

    /// 使用指定的缓存配置创建服务，`None` 表示不使用缓存
    pub fn with_cache_config(
        config: TranslationConfig,
        cache_config: Option<CacheConfig>,
    ) -> TranslationResult<Self> {
        config.validate()?;

        let client = TranslationClient::new(&config)?;

        let cache = cache_config.and_then(|cache_config| match PersistentCache::new(cache_config) {
            Ok(cache) => Some(cache),
            Err(e) => {
                log_error("创建翻译缓存失败，将不使用缓存", &TranslationError::from(e));
                None
            }
        });

        Ok(Self {
            client: Arc::new(client),
            languages: Arc::new(LanguageTable::with_bundled()),
            cache,
            stats: Arc::new(ServiceStats::default()),
            config: Arc::new(config),
        })
    }

    /// 打开缓存并加载在线语言列表
    ///
    /// 任何一步失败都只记录日志，服务仍然可用。
    pub async fn start(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.open().await {
                log_error("打开翻译缓存失败，将直接请求API", &TranslationError::from(e));
            }
        }

        if !self.client.has_credential() {
            tracing::info!("未配置API密钥，翻译功能未启用");
            return;
        }

        if let Err(e) = self.refresh_languages().await {
            log_error("加载语言列表失败", &e);
        }

        if self.config.show_usage {
            match self.usage().await {
                Ok(usage) => tracing::info!(
                    "已使用 {} / {} 字符 ({:.1}%)",
                    usage.character_count,
                    usage.character_limit,
                    usage.fraction_used() * 100.0
                ),
                Err(e) => log_error("查询额度失败", &e),
            }
        }
    }

    /// 翻译文本到 `query` 解析出的语言
    ///
    /// 未知语言、未启用或未配置密钥时静默返回 `Ok(None)`。
    pub async fn translate(&self, text: &str, query: &str) -> TranslationResult<Option<String>> {
        self.stats.inc_requests();

        let language = self.languages.resolve(query);
        if language.is_unknown() {
            tracing::debug!("[{}] 未知语言，跳过翻译", language.code);
            self.stats.inc_skipped();
            return Ok(None);
        }

        self.translate_to(text, &language).await
    }

    /// 翻译文本到已解析的语言
    pub async fn translate_to(
        &self,
        text: &str,
        language: &Language,
    ) -> TranslationResult<Option<String>> {
        if !self.config.enabled || language.is_unknown() || strip_markup(text).is_empty() {
            self.stats.inc_skipped();
            return Ok(None);
        }

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(text, language).await {
                tracing::debug!("[{}] 缓存命中", language.code);
                self.stats.inc_cache_hits();
                return Ok(Some(cached));
            }
            self.stats.inc_cache_misses();
        }

        if !self.client.has_credential() {
            self.stats.inc_skipped();
            return Ok(None);
        }

        self.stats.inc_remote_calls();
        match self.client.translate(text, language).await {
            Ok(Some(translated)) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(text, language, &translated).await {
                        log_error("写入翻译缓存失败", &TranslationError::from(e));
                    }
                }
                Ok(Some(translated))
            }
            Ok(None) => Ok(None),
            Err(e) if e.is_disabled() => {
                self.stats.inc_skipped();
                Ok(None)
            }
            Err(e) => {
                self.stats.inc_remote_failures();
                log_error(&format!("[{}] 翻译失败", language.code), &e);
                Err(e)
            }
        }
    }

    /// 在后台翻译，成功时调用 `callback`
    ///
    /// 必须在tokio运行时内调用，不会阻塞调用方。
    pub fn translate_with<F>(
        &self,
        text: impl Into<String>,
        query: impl Into<String>,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(String) + Send + 'static,
    {
        let service = self.clone();
        let text = text.into();
        let query = query.into();

        tokio::spawn(async move {
            if let Ok(Some(translated)) = service.translate(&text, &query).await {
                callback(translated);
            }
        })
    }

    /// 获取在线目标语言列表
    ///
    /// 依次替换可信列表、为缓存增加语言列；缓存失败不影响结果。
    pub async fn refresh_languages(&self) -> TranslationResult<Vec<Language>> {
        let languages = self.client.list_languages(LanguageKind::Target).await?;
        self.languages.replace_trusted(languages.clone());
        tracing::info!("已加载 {} 种在线语言", languages.len());

        if let Some(cache) = self.cache.as_ref().filter(|cache| cache.is_open()) {
            match cache.ensure_columns(&languages).await {
                Ok(0) => {}
                Ok(added) => tracing::info!("缓存新增 {} 个语言列", added),
                Err(e) => log_error("更新缓存语言列失败", &TranslationError::from(e)),
            }
        }

        Ok(languages)
    }

    /// 替换API密钥并重新加载语言列表
    pub async fn update_credential(&self, token: &str) -> TranslationResult<Vec<Language>> {
        self.client.set_credential(token);

        if !self.client.has_credential() {
            tracing::info!("API密钥已清除，翻译功能未启用");
            return Ok(Vec::new());
        }

        self.refresh_languages().await
    }

    /// 查询额度使用情况
    pub async fn usage(&self) -> TranslationResult<Usage> {
        self.client.usage().await
    }

    /// 关闭缓存，之后的缓存操作均为空操作
    pub async fn shutdown(&self) {
        if let Some(cache) = &self.cache {
            cache.close().await;
        }
    }

    /// 解析语言输入
    pub fn resolve(&self, query: &str) -> Language {
        self.languages.resolve(query)
    }

    pub fn languages(&self) -> &Arc<LanguageTable> {
        &self.languages
    }

    pub fn cache(&self) -> Option<&PersistentCache> {
        self.cache.as_ref()
    }

    pub fn client(&self) -> &TranslationClient {
        &self.client
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn stats(&self) -> ServiceStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn cache_stats(&self) -> Option<CacheStatsSnapshot> {
        self.cache.as_ref().map(PersistentCache::stats)
    }
}

/// 服务运行统计
#[derive(Debug, Default)]
pub struct ServiceStats {
    /// 收到的翻译请求数量
    pub requests: AtomicUsize,

    pub cache_hits: AtomicUsize,

    pub cache_misses: AtomicUsize,

    /// 实际发出的翻译API请求数量
    pub remote_calls: AtomicUsize,

    pub remote_failures: AtomicUsize,

    /// 因未知语言、空文本或功能关闭而跳过的请求
    pub skipped: AtomicUsize,
}

impl ServiceStats {
    pub fn inc_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_remote_calls(&self) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_remote_failures(&self) {
        self.remote_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取统计快照
    pub fn snapshot(&self) -> ServiceStatsSnapshot {
        ServiceStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            remote_calls: self.remote_calls.load(Ordering::Relaxed),
            remote_failures: self.remote_failures.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// 统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStatsSnapshot {
    pub requests: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub remote_calls: usize,
    pub remote_failures: usize,
    pub skipped: usize,
}

impl ServiceStatsSnapshot {
    /// 计算缓存命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
