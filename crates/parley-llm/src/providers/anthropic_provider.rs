use async_trait::async_trait;
use reqwest::header;

use crate::adapters::{ErrorResponse, MessagesRequest, MessagesResponse};
use crate::error::{LLMError, Result};
use crate::provider::{AuthConfig, LLMProvider, ProviderCapabilities, ProviderConfig, ProviderMetadata};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Seconds to wait after a 429 that carries no `retry-after` header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Anthropic Provider
/// Talks to the Messages API directly; one HTTP call per request, never retried
pub struct AnthropicProvider {
    config: ProviderConfig,
    http_client: reqwest::Client,
    metadata: ProviderMetadata,
}

impl AnthropicProvider {
    /// Create with custom configuration
    pub fn with_config(config: ProviderConfig) -> Result<Self> {
        let metadata = ProviderMetadata {
            id: config.provider_id.clone(),
            name: "Anthropic".to_string(),
            capabilities: ProviderCapabilities {
                streaming: false,
                vision: true,
            },
        };

        let mut builder = reqwest::Client::builder();
        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| LLMError::Config(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
            metadata,
        })
    }

    /// Create a new Anthropic provider with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(ProviderConfig::anthropic().with_api_key(api_key))
    }

    /// Create with custom base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let mut config = ProviderConfig::anthropic().with_api_key(api_key);
        config.base_url = base_url.into();
        Self::with_config(config)
    }

    /// Default model from the provider config
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.config.base_url.trim_end_matches('/'))
    }

    /// Build request headers
    fn build_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        headers.insert("anthropic-version", header::HeaderValue::from_static(ANTHROPIC_VERSION));

        match &self.config.auth {
            AuthConfig::ApiKey { key } => {
                headers.insert(
                    "x-api-key",
                    header::HeaderValue::from_str(key)
                        .map_err(|e| LLMError::Config(format!("Invalid API key: {}", e)))?,
                );
            }
            AuthConfig::Bearer { token } => {
                headers.insert(
                    header::AUTHORIZATION,
                    header::HeaderValue::from_str(&format!("Bearer {}", token))
                        .map_err(|e| LLMError::Config(format!("Invalid bearer token: {}", e)))?,
                );
            }
            AuthConfig::None => {
                return Err(LLMError::Auth("Anthropic requires API key or Bearer token".to_string()));
            }
        }

        for (key, value) in &self.config.headers {
            let header_name = header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| LLMError::Config(format!("Invalid header name: {}", e)))?;
            let header_value = header::HeaderValue::from_str(value)
                .map_err(|e| LLMError::Config(format!("Invalid header value: {}", e)))?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

/// Prefer the API's own error message over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn provider_id(&self) -> &str {
        &self.metadata.id
    }

    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn send(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let headers = self.build_headers()?;

        tracing::debug!(model = %request.model, max_tokens = request.max_tokens, "sending messages request");

        let response = self.http_client
            .post(self.messages_url())
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LLMError::Auth(error_message(&error_text)),
                429 => LLMError::RateLimited { retry_after },
                code => LLMError::Api {
                    status: code,
                    message: error_message(&error_text),
                },
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LLMError::Network(e.to_string()))?;

        serde_json::from_slice::<MessagesResponse>(&body)
            .map_err(|e| LLMError::Decode(e.to_string()))
    }

    async fn validate(&self) -> Result<()> {
        let _ = self.build_headers()?;
        Ok(())
    }
}
