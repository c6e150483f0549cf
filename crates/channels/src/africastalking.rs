//! Africa's Talking bulk SMS adapter.
//!
//! Outbound: form-encoded POST to `/version1/messaging` with the `apiKey`
//! header. The sandbox host is used when the username is `sandbox`.

use crate::sanitize_reply;
use async_trait::async_trait;
use mkulima_config::SmsConfig;
use mkulima_core::error::ChannelError;
use mkulima_core::sms::SmsGateway;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const LIVE_URL: &str = "https://api.africastalking.com/version1/messaging";
pub const SANDBOX_URL: &str = "https://api.sandbox.africastalking.com/version1/messaging";

/// Recipient status codes the API reports for accepted messages
/// (Processed, Sent, Queued).
const ACCEPTED_STATUS_CODES: [u16; 3] = [100, 101, 102];

pub struct AfricasTalkingGateway {
    username: String,
    api_key: String,
    sender_id: Option<String>,
    endpoint: String,
    max_chars: usize,
    client: reqwest::Client,
}

impl AfricasTalkingGateway {
    pub fn new(config: &SmsConfig, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        let endpoint = if config.username == "sandbox" {
            SANDBOX_URL
        } else {
            LIVE_URL
        };
        Self {
            username: config.username.clone(),
            api_key: api_key.into(),
            sender_id: config.sender_id.clone().filter(|s| !s.trim().is_empty()),
            endpoint: endpoint.into(),
            max_chars: config.max_reply_chars,
            client,
        }
    }

    /// Point the adapter at a different host (mock servers, proxies).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form<'a>(&'a self, to: &'a str, message: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut form = vec![
            ("username", self.username.as_str()),
            ("to", to),
            ("message", message),
        ];
        if let Some(from) = &self.sender_id {
            form.push(("from", from.as_str()));
        }
        form
    }
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(rename = "SMSMessageData")]
    data: SmsMessageData,
}

#[derive(Debug, Deserialize)]
struct SmsMessageData {
    #[serde(rename = "Message", default)]
    message: String,
    #[serde(rename = "Recipients", default)]
    recipients: Vec<Recipient>,
}

#[derive(Debug, Deserialize)]
struct Recipient {
    #[serde(rename = "statusCode")]
    status_code: u16,
    #[serde(default)]
    status: String,
}

/// Check the API's per-recipient verdict for a single-recipient send.
fn check_delivery(to: &str, body: &str) -> Result<(), ChannelError> {
    let parsed: SendResponse =
        serde_json::from_str(body).map_err(|e| ChannelError::DeliveryFailed {
            recipient: to.to_string(),
            reason: format!("unexpected response: {e}"),
        })?;

    match parsed.data.recipients.first() {
        Some(r) if ACCEPTED_STATUS_CODES.contains(&r.status_code) => Ok(()),
        Some(r) => Err(ChannelError::Rejected {
            recipient: to.to_string(),
            status: format!("{} ({})", r.status, r.status_code),
        }),
        None => Err(ChannelError::Rejected {
            recipient: to.to_string(),
            status: parsed.data.message,
        }),
    }
}

#[async_trait]
impl SmsGateway for AfricasTalkingGateway {
    fn name(&self) -> &str {
        "africastalking"
    }

    async fn send(&self, to: &str, text: &str) -> Result<(), ChannelError> {
        let message = sanitize_reply(text, self.max_chars);

        let response = self
            .client
            .post(&self.endpoint)
            .header("apiKey", &self.api_key)
            .header("Accept", "application/json")
            .form(&self.form(to, &message))
            .send()
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                recipient: to.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChannelError::DeliveryFailed {
                recipient: to.to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        check_delivery(to, &body)?;
        debug!(to, chars = message.chars().count(), "SMS sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(username: &str, sender_id: Option<&str>) -> SmsConfig {
        SmsConfig {
            username: username.into(),
            sender_id: sender_id.map(String::from),
            ..SmsConfig::default()
        }
    }

    #[test]
    fn sandbox_username_uses_sandbox_host() {
        let gw = AfricasTalkingGateway::new(&config("sandbox", None), "key");
        assert_eq!(gw.endpoint(), SANDBOX_URL);
        let gw = AfricasTalkingGateway::new(&config("mkulima", None), "key");
        assert_eq!(gw.endpoint(), LIVE_URL);
    }

    #[test]
    fn form_includes_sender_only_when_set() {
        let gw = AfricasTalkingGateway::new(&config("mkulima", None), "key");
        let form = gw.form("+254700000001", "hi");
        assert!(!form.iter().any(|(k, _)| *k == "from"));

        let gw = AfricasTalkingGateway::new(&config("mkulima", Some("MKULIMA")), "key");
        let form = gw.form("+254700000001", "hi");
        assert!(form.contains(&("from", "MKULIMA")));
        assert!(form.contains(&("username", "mkulima")));
    }

    #[test]
    fn accepted_recipient_is_ok() {
        let body = r#"{"SMSMessageData":{"Message":"Sent to 1/1 Total Cost: KES 0.8000","Recipients":[{"statusCode":101,"number":"+254700000001","status":"Success","cost":"KES 0.8000","messageId":"ATXid_1"}]}}"#;
        assert!(check_delivery("+254700000001", body).is_ok());
    }

    #[test]
    fn rejected_recipient_is_reported() {
        let body = r#"{"SMSMessageData":{"Message":"Sent to 0/1","Recipients":[{"statusCode":403,"number":"+254700000001","status":"InvalidPhoneNumber"}]}}"#;
        let err = check_delivery("+254700000001", body).unwrap_err();
        assert!(matches!(err, ChannelError::Rejected { .. }));
        assert!(err.to_string().contains("InvalidPhoneNumber"));
    }

    #[test]
    fn empty_recipients_is_rejection() {
        let body = r#"{"SMSMessageData":{"Message":"InvalidSenderId","Recipients":[]}}"#;
        assert!(check_delivery("+254700000001", body).is_err());
    }
}
