//! Conversation store adapter: turns a finished `AgentState` into one
//! atomic append.

use mkulima_core::agent::AgentState;
use mkulima_core::conversation::{ConversationStore, TurnRecord};
use mkulima_core::message::Role;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

/// Session titles keep this many characters of the first question.
pub const TITLE_CHARS: usize = 50;

/// Title for a new session: the first question, cut at 50 characters.
pub fn session_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    match trimmed.char_indices().nth(TITLE_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Build the record for the turn that just finished.
///
/// `None` when the state has no user message or does not end with an
/// assistant reply. A missing session id is replaced by a fresh UUID.
pub fn build_turn(state: &AgentState) -> Option<TurnRecord> {
    let user = state.latest_user_message()?;
    let answer = state
        .messages
        .last()
        .filter(|m| m.role == Role::Assistant && !m.requests_tools())?;
    let title = state
        .first_user_message()
        .map(|m| session_title(&m.content))
        .unwrap_or_default();

    Some(TurnRecord {
        session_id: state
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        user_id: state.user_id,
        title,
        user_content: user.content.clone(),
        user_timestamp: user.timestamp,
        assistant_content: answer.content.clone(),
        // History is ordered by timestamp; the reply never sorts before the question.
        assistant_timestamp: answer.timestamp.max(user.timestamp),
        metadata: state.context.to_metadata(),
    })
}

pub struct TurnPersister {
    store: Arc<dyn ConversationStore>,
    timeout: Duration,
}

impl TurnPersister {
    pub fn new(store: Arc<dyn ConversationStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Append the turn. Failures are logged and swallowed; the reply still
    /// goes out. Returns whether the turn was committed.
    ///
    /// Writes the session id back into `state` when one had to be generated.
    pub async fn persist(&self, state: &mut AgentState) -> bool {
        let Some(turn) = build_turn(state) else {
            error!("Turn has no user message or reply, nothing to persist");
            return false;
        };
        let session_id = turn.session_id.clone();
        state.session_id = Some(session_id.clone());

        match tokio::time::timeout(self.timeout, self.store.record_turn(turn)).await {
            Ok(Ok(())) => {
                debug!(session_id = %session_id, store = self.store.name(), "Turn persisted");
                true
            }
            Ok(Err(e)) => {
                error!(session_id = %session_id, error = %e, "Failed to persist turn");
                false
            }
            Err(_) => {
                error!(
                    session_id = %session_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Persisting turn timed out"
                );
                false
            }
        }
    }
}
