//! Domain event system — decoupled observation of what a turn did.
//!
//! The workflow publishes events as it goes; the gateway subscribes and
//! logs them. Publishing never blocks and never fails a turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// An inbound message arrived (SMS callback or direct chat)
    MessageReceived {
        channel: String,
        sender_id: String,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// The model produced the final answer for a turn
    ResponseGenerated {
        session_id: String,
        model: String,
        tokens_used: u32,
        tool_rounds: u32,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A turn was committed to the conversation store
    TurnPersisted {
        session_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A component failed; the turn continued on its degraded path
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Characters of inbound text carried by `MessageReceived`.
pub const PREVIEW_CHARS: usize = 50;

impl DomainEvent {
    /// `MessageReceived` with the text cut to a short preview, so full
    /// farmer messages never reach the logs.
    pub fn message_received(channel: &str, sender_id: &str, text: &str) -> Self {
        DomainEvent::MessageReceived {
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            content_preview: text.chars().take(PREVIEW_CHARS).collect(),
            timestamp: Utc::now(),
        }
    }

    /// Short machine-friendly label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::MessageReceived { .. } => "message_received",
            DomainEvent::ResponseGenerated { .. } => "response_generated",
            DomainEvent::ToolExecuted { .. } => "tool_executed",
            DomainEvent::TurnPersisted { .. } => "turn_persisted",
            DomainEvent::ErrorOccurred { .. } => "error_occurred",
        }
    }
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
