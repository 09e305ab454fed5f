//! 共享应用状态

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parley_config::{Config, ConfigManager, StorageConfig, StorageType};
use parley_llm::{AnthropicProvider, CompletionClient, LLMProvider, ProviderConfig};
use parley_store::{
    ConversationStore, Conversations, JsonlRecordStore, JsonlStoreConfig, MemoryRecordStore,
    RecordStore,
};
use tracing::info;

use crate::websocket::SessionRegistry;

/// 应用状态，在 main.rs 中创建并共享给所有 handler
pub struct AppState {
    pub registry: SessionRegistry,
    pub completion: CompletionClient,
    pub conversations: Arc<dyn ConversationStore>,
    pub config: ConfigManager,
}

impl AppState {
    pub fn new(
        config: ConfigManager,
        completion: CompletionClient,
        conversations: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            completion,
            conversations,
            config,
        }
    }

    /// Build the production state: Anthropic provider plus the configured store.
    pub async fn from_config(config_manager: ConfigManager, api_key: String) -> anyhow::Result<Self> {
        let config = config_manager.snapshot().await;

        let provider = build_provider(&config, api_key)?;
        provider
            .validate()
            .await
            .context("Invalid Anthropic provider configuration")?;
        let completion = CompletionClient::new(Arc::new(provider), &config.llm.model, config.llm.max_tokens);

        let conversations = build_conversations(&config.storage).await?;

        Ok(Self::new(config_manager, completion, Arc::new(conversations)))
    }
}

fn build_provider(config: &Config, api_key: String) -> anyhow::Result<AnthropicProvider> {
    let mut provider_config = ProviderConfig::anthropic()
        .with_api_key(api_key)
        .with_model(&config.llm.model)
        .with_timeout(Duration::from_secs(config.llm.timeout_seconds));
    provider_config.base_url = config.llm.base_url.clone();
    if let Some(headers) = &config.llm.headers {
        provider_config = provider_config.with_headers(headers.clone());
    }

    info!(
        base_url = %provider_config.base_url,
        model = %provider_config.model,
        max_tokens = config.llm.max_tokens,
        "LLM provider configured"
    );

    AnthropicProvider::with_config(provider_config).context("Failed to build Anthropic provider")
}

/// 按配置创建记录存储，并绑定到对话集合
pub async fn build_conversations(storage: &StorageConfig) -> anyhow::Result<Conversations> {
    let store: Arc<dyn RecordStore> = match storage.storage_type {
        StorageType::Jsonl => {
            let base_path = match &storage.path {
                Some(path) => parley_config::expand_tilde(path)
                    .with_context(|| format!("Cannot resolve storage path {}", path))?,
                None => parley_config::default_data_dir().context("Cannot resolve home directory")?,
            };
            info!("Using JSONL storage at {:?}", base_path);
            Arc::new(JsonlRecordStore::new(JsonlStoreConfig::new(base_path)).await?)
        }
        StorageType::Memory => {
            info!("Using in-memory storage; records are lost on exit");
            Arc::new(MemoryRecordStore::new())
        }
    };

    store.health_check().await.context("Storage health check failed")?;

    let conversations = Conversations::new(store, &storage.collection);
    if storage.create_collection {
        conversations
            .ensure_collection()
            .await
            .with_context(|| format!("Failed to create collection '{}'", storage.collection))?;
    }

    Ok(conversations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_jsonl_conversations_creates_collection() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let storage = StorageConfig {
            storage_type: StorageType::Jsonl,
            path: Some(temp_dir.path().to_string_lossy().into_owned()),
            ..StorageConfig::default()
        };

        let conversations = build_conversations(&storage).await.unwrap();
        conversations.save(None, "q", "a").await.unwrap();
        assert!(temp_dir.path().join("collections/conversations.jsonl").exists());
    }

    #[tokio::test]
    async fn test_build_memory_conversations_without_collection() {
        let storage = StorageConfig {
            storage_type: StorageType::Memory,
            create_collection: false,
            ..StorageConfig::default()
        };

        let conversations = build_conversations(&storage).await.unwrap();
        let err = conversations.save(None, "q", "a").await.unwrap_err();
        assert!(err.is_collection_not_found());
    }

    #[test]
    fn test_build_provider_uses_config() {
        let mut config = Config::default();
        config.llm.base_url = "http://127.0.0.1:1/v1".to_string();
        let provider = build_provider(&config, "sk-test".to_string()).unwrap();
        assert_eq!(provider.model(), "claude-3-7-sonnet-latest");
    }
}
