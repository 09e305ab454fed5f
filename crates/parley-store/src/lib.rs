//! # Parley Store
//!
//! 对话记录的持久化存储。
//!
//! ## 存储结构
//!
//! ```text
//! <base_path>/
//! └── collections/
//!     └── conversations.jsonl    # 每行一条 ConversationRecord
//! ```
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parley_store::{ConversationStore, Conversations, JsonlRecordStore, JsonlStoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = JsonlRecordStore::new(JsonlStoreConfig::new("/tmp/parley")).await?;
//!     let conversations = Conversations::new(Arc::new(store), "conversations");
//!     conversations.ensure_collection().await?;
//!
//!     conversations.save(None, "hello", "hi there").await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod jsonl_storage;
pub mod memory;
pub mod storage;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use jsonl_storage::{JsonlRecordStore, JsonlStoreConfig};
pub use memory::MemoryRecordStore;
pub use storage::{ConversationStore, Conversations, RecordStore};
pub use types::{is_valid_collection_name, Collection, ConversationRecord, UserRef};

/// 版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
