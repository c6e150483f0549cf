//! Persisted conversation model and the store contract.
//!
//! A session is an append-only log of messages keyed by an opaque string.
//! Each turn is appended as one unit: session created on first sight, then
//! the user message and the assistant reply, all inside one transaction.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A durable conversation container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Opaque unique key (e.g. `sms:+254700000001` or a UUID)
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who authored a persisted message. Only turns are persisted, so system
/// and tool messages never reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredRole {
    User,
    Assistant,
}

impl StoredRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoredRole::User => "user",
            StoredRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(StoredRole::User),
            "assistant" => Some(StoredRole::Assistant),
            _ => None,
        }
    }
}

/// A message as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub session_id: String,
    pub role: StoredRole,
    pub content: String,
    /// Serialized context bag; assistant messages only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Everything needed to append one turn.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub session_id: String,
    pub user_id: Option<i64>,
    /// Title used only when the session does not exist yet
    pub title: String,
    pub user_content: String,
    pub user_timestamp: DateTime<Utc>,
    pub assistant_content: String,
    pub assistant_timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

/// The conversation store contract.
///
/// Implementations: SQLite (sqlx) and in-memory (for tests and ephemeral
/// runs).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Append a turn atomically, creating the session if absent.
    async fn record_turn(&self, turn: TurnRecord) -> Result<(), StoreError>;

    /// Look up a session by its opaque key.
    async fn find_session(&self, session_id: &str) -> Result<Option<ChatSession>, StoreError>;

    /// The most recent `limit` messages of a session (all when `None`), in
    /// ascending timestamp order.
    async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<StoredMessage>, StoreError>;
}
