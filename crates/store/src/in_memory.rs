//! In-memory store — useful for testing and ephemeral runs.

use async_trait::async_trait;
use chrono::Utc;
use mkulima_core::conversation::{
    ChatSession, ConversationStore, StoredMessage, StoredRole, TurnRecord,
};
use mkulima_core::error::StoreError;
use mkulima_core::farm::{
    FarmRecords, FarmSnapshot, KnowledgeBase, KnowledgeEntry, UserDirectory, UserProfile,
};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    sessions: Vec<ChatSession>,
    messages: Vec<StoredMessage>,
    knowledge: Vec<KnowledgeEntry>,
    farms: Vec<(i64, FarmSnapshot)>,
    users: Vec<UserProfile>,
}

/// Every store trait over plain vectors behind one lock, so a turn is
/// appended atomically just like the SQLite transaction.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn message_count(&self) -> usize {
        self.tables.read().await.messages.len()
    }

    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn record_turn(&self, turn: TurnRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        let existing = tables
            .sessions
            .iter()
            .position(|s| s.session_id == turn.session_id);
        match existing {
            Some(idx) => tables.sessions[idx].updated_at = turn.assistant_timestamp,
            None => tables.sessions.push(ChatSession {
                session_id: turn.session_id.clone(),
                title: Some(turn.title.clone()),
                user_id: turn.user_id,
                is_active: true,
                created_at: turn.user_timestamp,
                updated_at: turn.assistant_timestamp,
            }),
        }

        tables.messages.push(StoredMessage {
            session_id: turn.session_id.clone(),
            role: StoredRole::User,
            content: turn.user_content,
            metadata: None,
            timestamp: turn.user_timestamp,
        });
        tables.messages.push(StoredMessage {
            session_id: turn.session_id,
            role: StoredRole::Assistant,
            content: turn.assistant_content,
            metadata: Some(turn.metadata),
            timestamp: turn.assistant_timestamp,
        });
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<ChatSession>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned())
    }

    async fn history(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let tables = self.tables.read().await;
        // Stable sort keeps insertion order for equal timestamps.
        let mut messages: Vec<StoredMessage> = tables
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);

        if let Some(limit) = limit {
            let skip = messages.len().saturating_sub(limit);
            messages.drain(..skip);
        }
        Ok(messages)
    }
}

#[async_trait]
impl KnowledgeBase for InMemoryStore {
    async fn find_active_by_category(
        &self,
        category_fragment: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeEntry>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .knowledge
            .iter()
            .filter(|e| {
                e.is_active
                    && e.category
                        .as_deref()
                        .unwrap_or("")
                        .contains(category_fragment)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn add_entry(&self, mut entry: KnowledgeEntry) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;
        let id = tables.knowledge.len() as i64 + 1;
        entry.id = id;
        tables.knowledge.push(entry);
        Ok(id)
    }
}

#[async_trait]
impl FarmRecords for InMemoryStore {
    async fn farms_for_user(&self, user_id: i64) -> Result<Vec<FarmSnapshot>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .farms
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, farm)| farm.clone())
            .collect())
    }

    async fn add_farm(&self, user_id: i64, farm: FarmSnapshot) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;
        tables.farms.push((user_id, farm));
        Ok(tables.farms.len() as i64)
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<UserProfile>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.phone_number.as_deref() == Some(phone_number))
            .cloned())
    }

    async fn register(
        &self,
        username: &str,
        phone_number: Option<&str>,
    ) -> Result<UserProfile, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == username) {
            return Err(StoreError::QueryFailed(format!(
                "username '{username}' already registered"
            )));
        }
        let user = UserProfile {
            id: tables.users.len() as i64 + 1,
            username: username.to_string(),
            first_name: None,
            last_name: None,
            phone_number: phone_number.map(str::to_string),
            is_premium: false,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }
}
