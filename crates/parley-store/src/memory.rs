//! In-memory record store (用于开发/测试)

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::storage::RecordStore;
use crate::types::{is_valid_collection_name, Collection, ConversationRecord};

/// 内存记录存储，进程退出后数据丢失
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    collections: RwLock<HashMap<String, Vec<ConversationRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the given collections already present.
    pub fn with_collections<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let collections = names
            .into_iter()
            .map(|name| (name.into(), Vec::new()))
            .collect();
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Number of records across all collections.
    pub fn record_count(&self) -> usize {
        self.collections.read().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create_collection(&self, name: &str) -> StorageResult<Collection> {
        if !is_valid_collection_name(name) {
            return Err(StorageError::InvalidCollectionName {
                name: name.to_string(),
            });
        }

        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(StorageError::CollectionAlreadyExists {
                name: name.to_string(),
            });
        }
        collections.insert(name.to_string(), Vec::new());
        Ok(Collection::new(name))
    }

    async fn find_collection(&self, name: &str) -> StorageResult<Collection> {
        if self.collections.read().contains_key(name) {
            Ok(Collection::new(name))
        } else {
            Err(StorageError::collection_not_found(name))
        }
    }

    async fn save_record(&self, collection: &Collection, record: &ConversationRecord) -> StorageResult<()> {
        let mut collections = self.collections.write();
        match collections.get_mut(&collection.name) {
            Some(records) => {
                records.push(record.clone());
                Ok(())
            }
            None => Err(StorageError::collection_not_found(&collection.name)),
        }
    }

    async fn list_records(&self, collection: &Collection) -> StorageResult<Vec<ConversationRecord>> {
        self.collections
            .read()
            .get(&collection.name)
            .cloned()
            .ok_or_else(|| StorageError::collection_not_found(&collection.name))
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
