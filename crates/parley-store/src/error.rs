//! # Storage Error Types
//!
//! 定义存储系统相关的错误类型。

use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化/反序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 集合不存在
    #[error("Collection not found: {name}")]
    CollectionNotFound { name: String },

    /// 集合已存在
    #[error("Collection already exists: {name}")]
    CollectionAlreadyExists { name: String },

    /// 集合名称不合法
    #[error("Invalid collection name: {name}")]
    InvalidCollectionName { name: String },

    /// 其他错误
    #[error("Storage error: {message}")]
    Other { message: String },
}

impl StorageError {
    /// 创建其他错误
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }

    pub fn is_collection_not_found(&self) -> bool {
        matches!(self, Self::CollectionNotFound { .. })
    }
}

/// 存储结果类型
pub type StorageResult<T> = Result<T, StorageError>;
