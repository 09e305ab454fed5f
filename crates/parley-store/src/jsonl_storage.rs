//! # JsonlRecordStore Implementation
//!
//! 基于 JSONL 文件的记录持久化存储实现。
//!
//! 存储结构:
//! ```text
//! <base_path>/
//! └── collections/
//!     ├── conversations.jsonl    # 每行一条记录(追加写入)
//!     └── ...
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::storage::RecordStore;
use crate::types::{is_valid_collection_name, Collection, ConversationRecord};

/// JsonlRecordStore 配置
#[derive(Debug, Clone)]
pub struct JsonlStoreConfig {
    /// 存储根目录
    pub base_path: PathBuf,
}

impl JsonlStoreConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

/// Append-only JSONL backend
#[derive(Debug)]
pub struct JsonlRecordStore {
    config: JsonlStoreConfig,
    collections_path: PathBuf,
    /// 串行化写入，保证每条记录整行落盘
    write_lock: Mutex<()>,
}

impl JsonlRecordStore {
    /// 创建存储并初始化目录结构
    pub async fn new(config: JsonlStoreConfig) -> StorageResult<Self> {
        let collections_path = config.base_path.join("collections");
        fs::create_dir_all(&collections_path).await?;

        info!("JsonlRecordStore initialized at {:?}", config.base_path);

        Ok(Self {
            config,
            collections_path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// 获取集合文件路径
    fn collection_file_path(&self, name: &str) -> PathBuf {
        self.collections_path.join(format!("{}.jsonl", name))
    }

    fn check_name(name: &str) -> StorageResult<()> {
        if is_valid_collection_name(name) {
            Ok(())
        } else {
            Err(StorageError::InvalidCollectionName {
                name: name.to_string(),
            })
        }
    }

    /// Append one full line; on failure the file is cut back to its prior length.
    async fn append_line(&self, path: &Path, line: &[u8]) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(path)
            .await?;
        let prior_len = file.metadata().await?.len();

        let written = async {
            file.write_all(line).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;

        if let Err(e) = written {
            warn!("Write to {:?} failed, rolling back partial line: {}", path, e);
            if let Err(truncate_err) = file.set_len(prior_len).await {
                warn!("Failed to roll back {:?}: {}", path, truncate_err);
            }
            return Err(e.into());
        }

        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonlRecordStore {
    async fn create_collection(&self, name: &str) -> StorageResult<Collection> {
        Self::check_name(name)?;
        let path = self.collection_file_path(name);

        match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(_) => {
                info!("Created collection '{}' at {:?}", name, path);
                Ok(Collection::new(name))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::CollectionAlreadyExists {
                    name: name.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_collection(&self, name: &str) -> StorageResult<Collection> {
        if !is_valid_collection_name(name) {
            return Err(StorageError::collection_not_found(name));
        }

        if fs::try_exists(self.collection_file_path(name)).await? {
            Ok(Collection::new(name))
        } else {
            Err(StorageError::collection_not_found(name))
        }
    }

    async fn save_record(&self, collection: &Collection, record: &ConversationRecord) -> StorageResult<()> {
        let path = self.collection_file_path(&collection.name);

        // 先完整序列化，再一次性追加
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        match self.append_line(&path, &line).await {
            Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::collection_not_found(&collection.name))
            }
            other => other,
        }?;

        debug!("Appended record {} to {:?}", record.id, path);
        Ok(())
    }

    async fn list_records(&self, collection: &Collection) -> StorageResult<Vec<ConversationRecord>> {
        let path = self.collection_file_path(&collection.name);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::collection_not_found(&collection.name));
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ConversationRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Failed to parse record line in {:?}: {}", path, e);
                }
            }
        }

        Ok(records)
    }

    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.collections_path).await?;
        if !metadata.is_dir() {
            return Err(StorageError::other(format!(
                "{:?} is not a directory",
                self.collections_path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserRef;
    use tempfile::TempDir;

    async fn store(dir: &TempDir) -> JsonlRecordStore {
        JsonlRecordStore::new(JsonlStoreConfig::new(dir.path())).await.unwrap()
    }

    #[tokio::test]
    async fn test_find_missing_collection() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir).await;

        let err = store.find_collection("conversations").await.unwrap_err();
        assert!(err.is_collection_not_found());
    }

    #[tokio::test]
    async fn test_create_collection_twice() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir).await;

        store.create_collection("conversations").await.unwrap();
        assert!(matches!(
            store.create_collection("conversations").await,
            Err(StorageError::CollectionAlreadyExists { .. })
        ));
        assert!(matches!(
            store.create_collection("../escape").await,
            Err(StorageError::InvalidCollectionName { .. })
        ));
    }

    #[tokio::test]
    async fn test_append_and_list_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir).await;
        let collection = store.create_collection("conversations").await.unwrap();

        let first = ConversationRecord::new(None, "one", "1");
        let second = ConversationRecord::new(Some(UserRef::new("u1")), "two", "2");
        store.save_record(&collection, &first).await.unwrap();
        store.save_record(&collection, &second).await.unwrap();

        let records = store.list_records(&collection).await.unwrap();
        assert_eq!(records, vec![first, second]);

        let raw = fs::read_to_string(temp_dir.path().join("collections/conversations.jsonl"))
            .await
            .unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_save_into_removed_collection_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir).await;
        let collection = store.create_collection("conversations").await.unwrap();
        fs::remove_file(temp_dir.path().join("collections/conversations.jsonl"))
            .await
            .unwrap();

        let err = store
            .save_record(&collection, &ConversationRecord::new(None, "q", "a"))
            .await
            .unwrap_err();
        assert!(err.is_collection_not_found());
        assert!(!temp_dir.path().join("collections/conversations.jsonl").exists());
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_lines() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir).await;
        let collection = store.create_collection("conversations").await.unwrap();

        let record = ConversationRecord::new(None, "q", "a");
        store.save_record(&collection, &record).await.unwrap();
        let path = temp_dir.path().join("collections/conversations.jsonl");
        let mut content = fs::read_to_string(&path).await.unwrap();
        content.push_str("{ truncated\n");
        fs::write(&path, content).await.unwrap();

        assert_eq!(store.list_records(&collection).await.unwrap(), vec![record]);
        assert!(store.health_check().await.is_ok());
    }
}
