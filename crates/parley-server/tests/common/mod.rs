#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parley_config::{ApiToken, Config, ConfigManager};
use parley_llm::{
    CompletionClient, ContentBlock, LLMError, LLMProvider, MessagesRequest, MessagesResponse,
    ProviderCapabilities, ProviderMetadata,
};
use parley_server::{serve, AppState};
use parley_store::{
    Collection, ConversationRecord, Conversations, MemoryRecordStore, RecordStore, StorageError,
    StorageResult,
};
use serde_json::json;

/// Input that makes [`StubProvider`] fail
pub const FAIL_INPUT: &str = "fail";

/// Echoes the user text back as `echo: <input>`, with an image block in
/// between that must be dropped by aggregation.
pub struct StubProvider {
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    inputs: parking_lot::Mutex<Vec<String>>,
    metadata: ProviderMetadata,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            inputs: parking_lot::Mutex::new(Vec::new()),
            metadata: ProviderMetadata {
                id: "stub".to_string(),
                name: "Stub Provider".to_string(),
                capabilities: ProviderCapabilities::default(),
            },
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }
}

#[async_trait]
impl LLMProvider for StubProvider {
    fn provider_id(&self) -> &str {
        &self.metadata.id
    }

    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    async fn send(&self, request: MessagesRequest) -> Result<MessagesResponse, LLMError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let input = request
            .messages
            .first()
            .and_then(|m| m.content.first())
            .and_then(ContentBlock::as_text)
            .unwrap_or_default()
            .to_string();
        self.inputs.lock().push(input.clone());

        if input == FAIL_INPUT {
            return Err(LLMError::Api {
                status: 529,
                message: "overloaded".to_string(),
            });
        }

        Ok(MessagesResponse::from_blocks(
            "msg_stub",
            request.model,
            vec![
                ContentBlock::text("echo: "),
                ContentBlock::Image {
                    source: json!({ "type": "url", "url": "https://example.com/x.png" }),
                },
                ContentBlock::text(input),
            ],
        ))
    }

    async fn validate(&self) -> Result<(), LLMError> {
        Ok(())
    }
}

/// Collection exists but every write fails
#[derive(Debug, Default)]
pub struct BrokenRecordStore;

#[async_trait]
impl RecordStore for BrokenRecordStore {
    async fn create_collection(&self, name: &str) -> StorageResult<Collection> {
        Ok(Collection::new(name))
    }

    async fn find_collection(&self, name: &str) -> StorageResult<Collection> {
        Ok(Collection::new(name))
    }

    async fn save_record(&self, _collection: &Collection, _record: &ConversationRecord) -> StorageResult<()> {
        Err(StorageError::other("disk full"))
    }

    async fn list_records(&self, _collection: &Collection) -> StorageResult<Vec<ConversationRecord>> {
        Ok(Vec::new())
    }

    async fn health_check(&self) -> StorageResult<()> {
        Err(StorageError::other("disk full"))
    }
}

pub fn config_manager(tokens: &[(&str, &str)], ws_requires_auth: bool) -> ConfigManager {
    let mut config = Config::default();
    config.auth.tokens = tokens
        .iter()
        .map(|(token, user_id)| ApiToken {
            token: token.to_string(),
            user_id: user_id.to_string(),
        })
        .collect();
    config.auth.ws_requires_auth = ws_requires_auth;
    ConfigManager::new(config, PathBuf::from("parley-test-config.json"))
}

pub fn app_state(
    provider: Arc<StubProvider>,
    store: Arc<dyn RecordStore>,
    config: ConfigManager,
) -> Arc<AppState> {
    let completion = CompletionClient::new(provider, "claude-3-7-sonnet-latest", 1024);
    let conversations = Conversations::new(store, "conversations");
    Arc::new(AppState::new(config, completion, Arc::new(conversations)))
}

pub fn memory_store() -> Arc<MemoryRecordStore> {
    Arc::new(MemoryRecordStore::with_collections(["conversations"]))
}

pub async fn records(store: &MemoryRecordStore) -> Vec<ConversationRecord> {
    store
        .list_records(&Collection::new("conversations"))
        .await
        .unwrap_or_default()
}

/// Bind an ephemeral port and serve until the test runtime shuts down.
pub async fn spawn_server(state: Arc<AppState>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, state, true, std::future::pending()).await.unwrap();
    });
    addr
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn wait_for<F>(condition: F)
where
    F: Fn() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}
