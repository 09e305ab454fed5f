//! # Conversation Types
//!
//! 定义持久化记录与集合的核心类型。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference to an authenticated user.
///
/// Only built from an identity the server has already resolved; anonymous
/// turns carry no `UserRef` at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRef(String);

impl UserRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一次完成的对话（输入 + AI 回复）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    pub user_input: String,
    pub ai_response: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl ConversationRecord {
    /// 创建新记录，id 与时间戳自动生成
    pub fn new(user: Option<UserRef>, user_input: impl Into<String>, ai_response: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user,
            user_input: user_input.into(),
            ai_response: ai_response.into(),
            created: now,
            updated: now,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }
}

/// A named collection returned by a successful lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Collection names map onto file names, so keep them to a safe charset.
pub fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
