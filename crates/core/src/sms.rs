//! SMS gateway trait — the boundary to the carrier-facing SMS provider.
//!
//! Inbound messages arrive as a gateway delivery callback; outbound replies
//! go through `SmsGateway::send`, exactly one per inbound message.

use crate::error::ChannelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A message delivered by the gateway's inbound callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundSms {
    /// Sender phone number in international format
    pub from: String,

    /// Message body
    pub text: String,

    /// Short code or number the farmer texted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    /// Gateway-assigned message id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl InboundSms {
    /// Session key for this sender. One SMS thread per phone number.
    pub fn session_key(&self) -> String {
        format!("sms:{}", self.from)
    }
}

#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// A human-readable name (e.g., "africastalking", "log").
    fn name(&self) -> &str;

    /// Send `text` to `to`. Implementations sanitise and clip the text.
    async fn send(&self, to: &str, text: &str) -> Result<(), ChannelError>;
}
