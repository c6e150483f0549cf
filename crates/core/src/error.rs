//! Error types for the Mkulima domain.
//!
//! One `thiserror` enum per collaborator. None of these ever reaches a
//! farmer: the workflow maps each to its degraded path (default
//! classification, empty context, degraded tool text, apology).

use thiserror::Error;

/// Startup-time failure while wiring collaborators together.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Language model call failures. The workflow turns any of these into the
/// apology reply.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The turn's writes were rolled back; nothing was persisted.
    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Outbound SMS failures.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The request never got an answer from the gateway.
    #[error("Message delivery failed to {recipient}: {reason}")]
    DeliveryFailed { recipient: String, reason: String },

    /// The gateway answered but refused this recipient.
    #[error("Gateway rejected message to {recipient}: {status}")]
    Rejected { recipient: String, status: String },
}
