//! # Storage Traits
//!
//! 定义底层记录存储 trait 以及面向对话的存储接口。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageResult;
use crate::types::{Collection, ConversationRecord, UserRef};

/// 基础记录存储 trait
///
/// A backend holds named collections of conversation records. Records are
/// append-only: nothing here updates or deletes one.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 创建集合（已存在时返回 `CollectionAlreadyExists`）
    async fn create_collection(&self, name: &str) -> StorageResult<Collection>;

    /// 按名称查找集合（不存在时返回 `CollectionNotFound`）
    async fn find_collection(&self, name: &str) -> StorageResult<Collection>;

    /// 保存记录；要么完整写入，要么完全不写
    async fn save_record(&self, collection: &Collection, record: &ConversationRecord) -> StorageResult<()>;

    /// 按写入顺序列出集合中的记录
    async fn list_records(&self, collection: &Collection) -> StorageResult<Vec<ConversationRecord>>;

    /// 健康检查
    async fn health_check(&self) -> StorageResult<()>;
}

/// Conversation Store: persists one completed turn.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Look up the collection, build a record and persist it.
    ///
    /// `user` is `None` for anonymous turns.
    async fn save(
        &self,
        user: Option<&UserRef>,
        user_input: &str,
        ai_response: &str,
    ) -> StorageResult<ConversationRecord>;
}

/// [`ConversationStore`] over any [`RecordStore`], bound to one collection name.
#[derive(Clone)]
pub struct Conversations {
    store: Arc<dyn RecordStore>,
    collection: String,
}

impl Conversations {
    pub fn new(store: Arc<dyn RecordStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Create the bound collection if it is missing.
    pub async fn ensure_collection(&self) -> StorageResult<Collection> {
        match self.store.find_collection(&self.collection).await {
            Ok(collection) => Ok(collection),
            Err(e) if e.is_collection_not_found() => self.store.create_collection(&self.collection).await,
            Err(e) => Err(e),
        }
    }

    /// All records of the bound collection.
    pub async fn list(&self) -> StorageResult<Vec<ConversationRecord>> {
        let collection = self.store.find_collection(&self.collection).await?;
        self.store.list_records(&collection).await
    }
}

#[async_trait]
impl ConversationStore for Conversations {
    async fn save(
        &self,
        user: Option<&UserRef>,
        user_input: &str,
        ai_response: &str,
    ) -> StorageResult<ConversationRecord> {
        let collection = self.store.find_collection(&self.collection).await?;
        let record = ConversationRecord::new(user.cloned(), user_input, ai_response);
        self.store.save_record(&collection, &record).await?;

        debug!(
            collection = %collection.name,
            record_id = %record.id,
            anonymous = record.is_anonymous(),
            "conversation saved"
        );
        Ok(record)
    }
}
