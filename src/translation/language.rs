//! 语言表
//!
//! 维护两组语言：随程序打包的离线列表，以及从远程API获取的可信列表。
//! 用户输入的语言名称或代码通过 [`LanguageTable::resolve`] 解析为规范语言。

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// 随程序打包的离线语言列表
pub const BUNDLED_LANGUAGES: &str = include_str!("resources/languages.json");

/// 语言来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageOrigin {
    /// 来自远程API的实时列表
    Trusted,
    /// 来自离线列表，仅用于在线列表获取之前解析名称
    Offline,
    /// 无法识别的输入，不能用于请求或缓存
    Unknown,
}

/// 目标语言
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Language {
    /// 规范代码，同时作为API参数和缓存列名
    pub code: String,
    pub name: String,
    pub origin: LanguageOrigin,
}

impl Language {
    pub fn trusted(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            origin: LanguageOrigin::Trusted,
        }
    }

    pub fn offline(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            origin: LanguageOrigin::Offline,
        }
    }

    pub fn unknown(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: "Unknown".to_string(),
            origin: LanguageOrigin::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.origin == LanguageOrigin::Unknown
    }
}

/// API与离线资源共用的语言条目格式
#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct LanguageEntry {
    pub language: String,
    pub name: String,
}

/// 解析离线语言列表，失败时返回空列表
pub fn load_offline(data: &str) -> Vec<Language> {
    match serde_json::from_str::<Vec<LanguageEntry>>(data) {
        Ok(entries) => entries
            .into_iter()
            .map(|entry| Language::offline(entry.language, entry.name))
            .collect(),
        Err(e) => {
            tracing::warn!("离线语言列表加载失败，将仅依赖在线列表: {}", e);
            Vec::new()
        }
    }
}

/// 语言表
///
/// 可信列表在每次刷新时整体替换，读取方只会看到完整的旧列表或新列表。
#[derive(Debug)]
pub struct LanguageTable {
    trusted: RwLock<Arc<Vec<Language>>>,
    offline: Arc<Vec<Language>>,
}

impl LanguageTable {
    /// 使用给定的离线列表创建语言表
    pub fn new(offline: Vec<Language>) -> Self {
        let offline = offline
            .into_iter()
            .map(|language| Language {
                origin: LanguageOrigin::Offline,
                ..language
            })
            .collect();

        Self {
            trusted: RwLock::new(Arc::new(Vec::new())),
            offline: Arc::new(offline),
        }
    }

    /// 使用随程序打包的离线列表创建语言表
    pub fn with_bundled() -> Self {
        Self::new(load_offline(BUNDLED_LANGUAGES))
    }

    /// 解析用户输入的语言
    ///
    /// 先比较代码，再比较名称前缀；可信列表优先于离线列表。
    pub fn resolve(&self, query: &str) -> Language {
        let needle = query.trim().to_uppercase();

        if needle.is_empty() {
            return Language::unknown(needle);
        }

        let trusted = self.trusted();

        for list in [trusted.as_slice(), self.offline.as_slice()] {
            if let Some(language) = list
                .iter()
                .find(|language| language.code.eq_ignore_ascii_case(&needle))
            {
                return language.clone();
            }

            if let Some(language) = list
                .iter()
                .find(|language| language.name.to_uppercase().starts_with(&needle))
            {
                return language.clone();
            }
        }

        Language::unknown(needle)
    }

    /// 整体替换可信列表
    pub fn replace_trusted(&self, languages: Vec<Language>) {
        let languages: Vec<Language> = languages
            .into_iter()
            .map(|language| Language {
                origin: LanguageOrigin::Trusted,
                ..language
            })
            .collect();

        let mut guard = self.trusted.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(languages);
    }

    /// 当前可信列表的快照
    pub fn trusted(&self) -> Arc<Vec<Language>> {
        let guard = self.trusted.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn offline(&self) -> &[Language] {
        &self.offline
    }

    pub fn has_trusted(&self) -> bool {
        !self.trusted().is_empty()
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::with_bundled()
    }
}
