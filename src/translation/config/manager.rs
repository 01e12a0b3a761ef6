//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::env::EnvVar;
use crate::translation::error::{ConfigError, TranslationResult};
use crate::translation::storage::{cache::is_valid_table_name, CacheConfig, CacheLocation};

/// 翻译配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 基础配置
    pub enabled: bool,
    /// API密钥，`:fx` 结尾表示免费版
    pub token: String,
    /// 默认目标语言，可以是代码或名称前缀
    pub language: String,
    /// 覆盖根据密钥推导出的API地址
    pub api_url: Option<String>,
    pub request_timeout_secs: u64,
    pub user_agent: String,

    // 缓存配置
    pub cache_enabled: bool,
    pub cache_path: String,
    pub cache_table: String,

    /// 启动时打印额度使用情况
    pub show_usage: bool,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: String::new(),
            language: constants::DEFAULT_LANGUAGE.to_string(),
            api_url: None,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: constants::DEFAULT_USER_AGENT.to_string(),

            cache_enabled: true,
            cache_path: constants::DEFAULT_CACHE_PATH.to_string(),
            cache_table: constants::DEFAULT_CACHE_TABLE.to_string(),

            show_usage: false,
        }
    }
}

impl TranslationConfig {
    /// 创建带指定密钥的默认配置
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("请求超时必须大于0".to_string()).into());
        }

        if let Some(url) = &self.api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "API地址必须以 http:// 或 https:// 开头: {}",
                    url
                ))
                .into());
            }
        }

        if !is_valid_table_name(&self.cache_table) {
            return Err(
                ConfigError::Invalid(format!("无效的缓存表名: {}", self.cache_table)).into(),
            );
        }

        if self.cache_enabled && self.cache_path.trim().is_empty() {
            return Err(ConfigError::Invalid("启用缓存时缓存路径不能为空".to_string()).into());
        }

        Ok(())
    }

    /// 应用环境变量覆盖，只有显式设置的变量才生效
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{cache, translation};

        if let Some(enabled) = env_override::<bool, translation::Enabled>() {
            self.enabled = enabled;
        }

        // 密钥还接受 DEEPL_AUTH_KEY，由 Token::get 处理
        if let Ok(token) = translation::Token::get() {
            self.token = token;
        }

        if let Some(language) = env_override::<String, translation::Language>() {
            self.language = language;
        }

        if let Some(api_url) = env_override::<String, translation::ApiUrl>() {
            tracing::info!("环境变量覆盖 API URL: {}", api_url);
            self.api_url = Some(api_url);
        }

        if let Some(timeout) = env_override::<Duration, translation::Timeout>() {
            self.request_timeout_secs = timeout.as_secs();
        }

        if let Some(cache_enabled) = env_override::<bool, cache::Enabled>() {
            self.cache_enabled = cache_enabled;
        }

        if let Some(path) = env_override::<String, cache::Path>() {
            self.cache_path = path;
        }

        if let Some(table) = env_override::<String, cache::Table>() {
            self.cache_table = table;
        }
    }

    /// 转换为Duration类型
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 展开 `~` 之后的缓存文件路径
    pub fn cache_file(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.cache_path).as_ref())
    }

    /// 持久化缓存配置
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            location: CacheLocation::File(self.cache_file()),
            table: self.cache_table.clone(),
        }
    }

    pub fn has_token(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

/// 读取显式设置的环境变量，无效值记录警告后忽略
fn env_override<T, V: EnvVar<T>>() -> Option<T> {
    let value = std::env::var(V::NAME).ok()?;
    match V::parse(&value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("忽略无效的环境变量: {}", e);
            None
        }
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: TranslationConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 按搜索路径加载配置，然后应用环境变量覆盖
    pub fn new() -> TranslationResult<Self> {
        Self::load_dotenv();

        let source = Self::find_config_file();
        let config = match &source {
            Some(path) => {
                tracing::info!("加载配置文件: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                tracing::info!("未找到配置文件，使用默认配置");
                TranslationConfig::default()
            }
        };

        Self::finish(config, source)
    }

    /// 从指定文件加载配置，然后应用环境变量覆盖
    pub fn from_path(path: impl AsRef<Path>) -> TranslationResult<Self> {
        Self::load_dotenv();

        let path = PathBuf::from(shellexpand::tilde(&path.as_ref().to_string_lossy()).as_ref());
        tracing::info!("加载配置文件: {}", path.display());
        let config = Self::load_from_file(&path)?;

        Self::finish(config, Some(path))
    }

    fn finish(mut config: TranslationConfig, source: Option<PathBuf>) -> TranslationResult<Self> {
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config, source })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    /// 实际加载的配置文件
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn find_config_file() -> Option<PathBuf> {
        constants::CONFIG_PATHS
            .iter()
            .map(|path| PathBuf::from(shellexpand::tilde(path).as_ref()))
            .find(|path| path.exists())
    }

    /// 从指定文件加载配置，`.json` 以外的扩展名都按TOML解析
    pub fn load_from_file(path: &Path) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::from)?;

        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("JSON解析错误: {}", e)).into())
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::from(e).into())
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        for env_file in constants::ENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: impl AsRef<Path>) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| ConfigError::Parse(format!("序列化配置失败: {}", e)))?;

        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(ConfigError::from)?;
        }
        std::fs::write(path, content).map_err(ConfigError::from)?;

        Ok(())
    }
}
