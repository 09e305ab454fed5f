use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Authentication configuration enum
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// API key sent as `x-api-key`
    ApiKey {
        key: String,
    },
    /// Bearer token sent as `Authorization: Bearer`
    Bearer {
        token: String,
    },
    /// No authentication
    #[default]
    None,
}

impl AuthConfig {
    /// Create API key auth from environment variable, ignoring empty values
    pub fn from_env(env_var: &str) -> Option<Self> {
        std::env::var(env_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|key| Self::ApiKey { key })
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider ID
    pub provider_id: String,
    /// Base URL for the API
    pub base_url: String,
    /// Authentication configuration
    #[serde(flatten)]
    pub auth: AuthConfig,
    /// Default model to use
    pub model: String,
    /// Request timeout; zero means no timeout
    #[serde(with = "serde_duration", default = "default_timeout")]
    pub timeout: Duration,
    /// Additional headers to include
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    /// Create a new provider config
    pub fn new(provider_id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Anthropic defaults: public endpoint, latest Sonnet model
    pub fn anthropic() -> Self {
        Self::default()
    }

    /// Set API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.auth = AuthConfig::ApiKey { key: key.into() };
        self
    }

    /// Set bearer token
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthConfig::Bearer { token: token.into() };
        self
    }

    /// Set model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a custom header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set multiple headers
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_id: "anthropic".to_string(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            auth: AuthConfig::None,
            model: "claude-3-7-sonnet-latest".to_string(),
            timeout: default_timeout(),
            headers: HashMap::new(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

// Custom serialization for Duration
mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = ProviderConfig::anthropic()
            .with_api_key("sk-test")
            .with_model("claude-test")
            .with_timeout(Duration::from_secs(5))
            .with_header("anthropic-beta", "x");

        assert_eq!(config.provider_id, "anthropic");
        assert_eq!(config.model, "claude-test");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(matches!(config.auth, AuthConfig::ApiKey { ref key } if key == "sk-test"));
        assert_eq!(config.headers.get("anthropic-beta").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_serde_roundtrip_keeps_timeout_in_seconds() {
        let config = ProviderConfig::anthropic().with_api_key("k");
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["timeout"], 60);
        assert_eq!(value["type"], "api_key");

        let back: ProviderConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_from_env_ignores_empty_values() {
        std::env::set_var("PARLEY_LLM_TEST_EMPTY_KEY", "  ");
        assert!(AuthConfig::from_env("PARLEY_LLM_TEST_EMPTY_KEY").is_none());
        std::env::set_var("PARLEY_LLM_TEST_KEY", "sk-1");
        assert!(matches!(
            AuthConfig::from_env("PARLEY_LLM_TEST_KEY"),
            Some(AuthConfig::ApiKey { key }) if key == "sk-1"
        ));
    }
}
