//! Logging gateway, used when no SMS credentials are configured.

use crate::sanitize_reply;
use async_trait::async_trait;
use mkulima_core::error::ChannelError;
use mkulima_core::sms::SmsGateway;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::info;

/// How many sends the gateway remembers.
pub const RECENT_CAPACITY: usize = 32;

/// Logs outbound messages instead of sending them and keeps the most recent
/// [`RECENT_CAPACITY`] for inspection.
pub struct LogGateway {
    max_chars: usize,
    sent: Mutex<VecDeque<(String, String)>>,
}

impl LogGateway {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            sent: Mutex::new(VecDeque::with_capacity(RECENT_CAPACITY)),
        }
    }

    /// Recent `(recipient, text)` pairs, oldest first.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SmsGateway for LogGateway {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, to: &str, text: &str) -> Result<(), ChannelError> {
        let message = sanitize_reply(text, self.max_chars);
        info!(to, message = %message, "SMS (not sent, no gateway configured)");
        if let Ok(mut sent) = self.sent.lock() {
            if sent.len() == RECENT_CAPACITY {
                sent.pop_front();
            }
            sent.push_back((to.to_string(), message));
        }
        Ok(())
    }
}
