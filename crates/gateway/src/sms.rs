//! `POST /sms/callback` — inbound SMS delivery from the gateway.
//!
//! One inbound message runs one workflow turn and produces exactly one
//! outbound SMS. The reply text is echoed in the HTTP response body.

use axum::{Form, extract::State, http::StatusCode};
use mkulima_core::event::DomainEvent;
use mkulima_core::sms::InboundSms;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::SharedState;

/// Form fields posted by Africa's Talking. `date` and `linkId` are accepted
/// and ignored.
#[derive(Debug, Deserialize)]
pub struct SmsCallback {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub text: String,
    pub to: Option<String>,
    pub id: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "linkId")]
    pub link_id: Option<String>,
}

impl SmsCallback {
    fn into_inbound(self) -> InboundSms {
        InboundSms {
            from: self.from.trim().to_string(),
            text: self.text.trim().to_string(),
            to: self.to,
            id: self.id,
        }
    }
}

pub async fn sms_callback_handler(
    State(state): State<SharedState>,
    Form(payload): Form<SmsCallback>,
) -> Result<String, (StatusCode, String)> {
    let sms = payload.into_inbound();
    if sms.text.is_empty() || sms.from.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Missing sender or message text".to_string(),
        ));
    }

    info!(from = %sms.from, id = ?sms.id, chars = sms.text.chars().count(), "SMS received");
    state
        .event_bus
        .publish(DomainEvent::message_received("sms", &sms.from, &sms.text));

    let user_id = match state.users.find_by_phone(&sms.from).await {
        Ok(user) => user.map(|u| u.id),
        Err(e) => {
            warn!(from = %sms.from, error = %e, "User lookup failed, answering anonymously");
            None
        }
    };

    let outcome = state
        .agent
        .respond(&sms.text, user_id, Some(sms.session_key()))
        .await;

    // Always 200 once the turn ran: the gateway redelivers on anything else.
    if let Err(e) = state.sms.send(&sms.from, &outcome.reply).await {
        error!(to = %sms.from, gateway = state.sms.name(), error = %e, "SMS reply not delivered");
    }

    Ok(outcome.reply)
}
