//! SMS gateway adapters for Mkulima Smart.
//!
//! - **Africa's Talking** — the production gateway
//! - **Log** — no-op gateway for development, used when no API key is set
//!
//! Both strip `*` from outbound text and clip it to the configured length.

pub mod africastalking;
pub mod log;

use mkulima_config::SmsConfig;
use mkulima_core::sms::SmsGateway;
use std::sync::Arc;
use tracing::info;

pub use africastalking::AfricasTalkingGateway;
pub use log::LogGateway;

/// Make model output SMS-safe: no `*`, at most `max_chars` characters.
pub fn sanitize_reply(text: &str, max_chars: usize) -> String {
    text.chars()
        .filter(|c| *c != '*')
        .collect::<String>()
        .trim()
        .chars()
        .take(max_chars)
        .collect()
}

/// The configured gateway, or the logging gateway when no key is set.
pub fn gateway_from_config(config: &SmsConfig) -> Arc<dyn SmsGateway> {
    match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(key) => {
            info!(username = %config.username, "Using Africa's Talking SMS gateway");
            Arc::new(AfricasTalkingGateway::new(config, key))
        }
        None => {
            info!("No SMS API key configured, replies will only be logged");
            Arc::new(LogGateway::new(config.max_reply_chars))
        }
    }
}
