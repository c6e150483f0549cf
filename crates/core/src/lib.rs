//! # Mkulima Core
//!
//! Domain types, capability traits, and error definitions for the Mkulima
//! Smart SMS advisory service. This crate has no framework dependencies; it
//! defines the model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (language model, weather tool, knowledge
//! base, farm records, conversation store, SMS gateway) is a trait here.
//! Implementations live in their own crates, so the agent workflow can be
//! exercised with in-memory fakes and no network credentials.

pub mod agent;
pub mod conversation;
pub mod error;
pub mod event;
pub mod farm;
pub mod message;
pub mod provider;
pub mod sms;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentState, ContextBag, QueryClassification};
pub use conversation::{ChatSession, ConversationStore, StoredMessage, StoredRole, TurnRecord};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use farm::{
    CropRecord, FarmRecords, FarmSnapshot, KnowledgeBase, KnowledgeEntry, LivestockRecord,
    UserDirectory, UserProfile,
};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use sms::{InboundSms, SmsGateway};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
