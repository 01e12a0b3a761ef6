//! DeepL v2 API客户端
//!
//! 负责构造带授权的表单请求、将状态码映射为 [`RemoteError`]、解析响应体。
//! 本层不做重试，也不限制并发。

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::translation::config::{constants, TranslationConfig};
use crate::translation::error::{ConfigError, RemoteError, TranslationResult};
use crate::translation::language::{Language, LanguageEntry};
use crate::translation::pipeline::filters::{strip_markup, unescape_html};

/// 根据密钥后缀选择API地址
pub fn endpoint_for(token: &str) -> &'static str {
    if token.ends_with(constants::FREE_KEY_SUFFIX) {
        constants::FREE_API_URL
    } else {
        constants::PRO_API_URL
    }
}

/// 语言列表类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageKind {
    Source,
    Target,
}

impl LanguageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageKind::Source => "source",
            LanguageKind::Target => "target",
        }
    }
}

/// 翻译额度使用情况
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub character_count: i64,
    pub character_limit: i64,
}

impl Usage {
    pub fn remaining(&self) -> i64 {
        (self.character_limit - self.character_count).max(0)
    }

    /// 已使用比例，额度为0时返回0
    pub fn fraction_used(&self) -> f64 {
        if self.character_limit <= 0 {
            0.0
        } else {
            self.character_count as f64 / self.character_limit as f64
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<TranslatedSegment>,
}

#[derive(Debug, Deserialize)]
struct TranslatedSegment {
    text: String,
}

#[derive(Debug, Clone)]
struct Credential {
    token: String,
    base_url: String,
}

/// 翻译API客户端
#[derive(Debug)]
pub struct TranslationClient {
    http: Client,
    credential: RwLock<Credential>,
    /// 固定的API地址，设置后不再根据密钥推导
    api_url: Option<String>,
    user_agent: String,
}

impl TranslationClient {
    /// 根据配置创建客户端
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        Self::with_timeout(
            &config.token,
            config.api_url.clone(),
            &config.user_agent,
            config.request_timeout(),
        )
    }

    pub fn with_timeout(
        token: &str,
        api_url: Option<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> TranslationResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("无法创建HTTP客户端: {}", e)))?;

        let api_url = api_url.map(|url| url.trim_end_matches('/').to_string());
        let credential = Credential {
            token: token.trim().to_string(),
            base_url: api_url
                .clone()
                .unwrap_or_else(|| endpoint_for(token.trim()).to_string()),
        };

        Ok(Self {
            http,
            credential: RwLock::new(credential),
            api_url,
            user_agent: format!("{} (polywoof)", user_agent),
        })
    }

    /// 替换API密钥，并重新推导API地址
    pub fn set_credential(&self, token: &str) {
        let token = token.trim().to_string();
        let base_url = self
            .api_url
            .clone()
            .unwrap_or_else(|| endpoint_for(&token).to_string());

        let mut guard = self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Credential { token, base_url };
    }

    pub fn has_credential(&self) -> bool {
        !self.current().token.is_empty()
    }

    /// 当前使用的API地址
    pub fn base_url(&self) -> String {
        self.current().base_url
    }

    fn current(&self) -> Credential {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> TranslationResult<String> {
        let credential = self.current();
        if credential.token.is_empty() {
            return Err(ConfigError::MissingCredential.into());
        }

        let url = format!("{}{}", credential.base_url, path);
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("DeepL-Auth-Key {}", credential.token))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .form(form)
            .send()
            .await
            .map_err(RemoteError::from)?;

        let status = response.status().as_u16();
        if let Some(error) = RemoteError::from_status(status) {
            tracing::debug!("{} 返回状态码 {}", path, status);
            return Err(error.into());
        }

        let body = response.text().await.map_err(RemoteError::from)?;
        Ok(body)
    }

    /// 翻译单条文本
    ///
    /// 输入先去除标记；过滤后为空或目标语言未知时不发送请求，返回 `Ok(None)`。
    pub async fn translate(
        &self,
        text: &str,
        language: &Language,
    ) -> TranslationResult<Option<String>> {
        let text = strip_markup(text);
        if text.is_empty() || language.is_unknown() {
            return Ok(None);
        }

        let body = self
            .post(
                "/v2/translate",
                &[
                    ("text", text.as_str()),
                    ("target_lang", language.code.as_str()),
                    ("source_lang", constants::SOURCE_LANGUAGE),
                    ("preserve_formatting", "1"),
                    ("tag_handling", "html"),
                    ("non_splitting_tags", "br"),
                ],
            )
            .await?;

        let response: TranslateResponse =
            serde_json::from_str(&body).map_err(RemoteError::from)?;

        let translated = response
            .translations
            .iter()
            .map(|segment| unescape_html(&segment.text))
            .collect::<String>();

        Ok(Some(translated))
    }

    /// 获取支持的语言列表，结果均为可信语言
    pub async fn list_languages(&self, kind: LanguageKind) -> TranslationResult<Vec<Language>> {
        let body = self.post("/v2/languages", &[("type", kind.as_str())]).await?;
        let entries: Vec<LanguageEntry> =
            serde_json::from_str(&body).map_err(RemoteError::from)?;

        Ok(entries
            .into_iter()
            .map(|entry| Language::trusted(entry.language, entry.name))
            .collect())
    }

    /// 查询额度使用情况
    pub async fn usage(&self) -> TranslationResult<Usage> {
        let body = self.post("/v2/usage", &[]).await?;
        let usage = serde_json::from_str(&body).map_err(RemoteError::from)?;
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::error::TranslationError;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, token: &str) -> TranslationClient {
        TranslationClient::with_timeout(
            token,
            Some(server.base_url()),
            "test-agent",
            Duration::from_secs(5),
        )
        .expect("client")
    }

    fn russian() -> Language {
        Language::trusted("RU", "Russian")
    }

    #[test]
    fn test_endpoint_selection() {
        assert_eq!(endpoint_for("abc:fx"), "https://api-free.deepl.com");
        assert_eq!(endpoint_for("abc"), "https://api.deepl.com");
        assert_eq!(endpoint_for("abc:fx:pro"), "https://api.deepl.com");
    }

    #[test]
    fn test_set_credential_rederives_endpoint() {
        let client =
            TranslationClient::with_timeout("key", None, "agent", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "https://api.deepl.com");

        client.set_credential("key:fx");
        assert_eq!(client.base_url(), "https://api-free.deepl.com");
        assert!(client.has_credential());

        client.set_credential("  ");
        assert!(!client.has_credential());
    }

    #[test]
    fn test_usage_helpers() {
        let usage = Usage {
            character_count: 250,
            character_limit: 1000,
        };
        assert_eq!(usage.remaining(), 750);
        assert!((usage.fraction_used() - 0.25).abs() < f64::EPSILON);
        assert_eq!(Usage::default().fraction_used(), 0.0);
    }

    #[tokio::test]
    async fn test_missing_credential_sends_nothing() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|_when, then| {
            then.status(200);
        });

        let client = client_for(&server, "");
        let result = client.translate("Hello", &russian()).await;
        assert_eq!(
            result,
            Err(TranslationError::Config(ConfigError::MissingCredential))
        );
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_translate_concatenates_segments() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/translate")
                .header("authorization", "DeepL-Auth-Key secret:fx")
                .header("accept", "application/json")
                .header("user-agent", "test-agent (polywoof)");
            then.status(200).json_body(json!({
                "translations": [
                    {"detected_source_language": "EN", "text": "Привет, "},
                    {"detected_source_language": "EN", "text": "мир &amp; всё"}
                ]
            }));
        });

        let client = client_for(&server, "secret:fx");
        let translated = client.translate("Hello, <col=ff0000>world</col>", &russian()).await;
        assert_eq!(translated, Ok(Some("Привет, мир & всё".to_string())));
        mock.assert();
    }

    #[tokio::test]
    async fn test_quota_exceeded_maps_status() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v2/translate");
            then.status(456);
        });

        let client = client_for(&server, "secret");
        assert_eq!(
            client.translate("Hello", &russian()).await,
            Err(TranslationError::Remote(RemoteError::QuotaExceeded))
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_internal() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v2/usage");
            then.status(200).body("not json");
        });

        let client = client_for(&server, "secret");
        assert!(matches!(
            client.usage().await,
            Err(TranslationError::Remote(RemoteError::Internal(_)))
        ));
    }

    #[tokio::test]
    async fn test_skips_empty_and_unknown() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|_when, then| {
            then.status(200);
        });

        let client = client_for(&server, "secret");
        assert_eq!(client.translate("<br>  <b></b>", &russian()).await, Ok(None));
        assert_eq!(
            client.translate("Hello", &Language::unknown("ZZ")).await,
            Ok(None)
        );
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_list_languages_are_trusted() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v2/languages");
            then.status(200).json_body(json!([
                {"language": "RU", "name": "Russian", "supports_formality": true},
                {"language": "DE", "name": "German", "supports_formality": true}
            ]));
        });

        let client = client_for(&server, "secret");
        let languages = client.list_languages(LanguageKind::Target).await.unwrap();
        assert_eq!(languages, vec![russian(), Language::trusted("DE", "German")]);
    }

    #[tokio::test]
    async fn test_usage_parses_counts() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v2/usage");
            then.status(200)
                .json_body(json!({"character_count": 180118, "character_limit": 500000}));
        });

        let client = client_for(&server, "secret");
        let usage = client.usage().await.unwrap();
        assert_eq!(usage.character_count, 180118);
        assert_eq!(usage.remaining(), 319882);
    }
}
