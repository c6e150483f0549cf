//! HTTP API v1 — direct chat and session history.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`                            — Send a message, get the reply
//! - `GET  /v1/sessions/{session_id}/messages`  — Stored history, oldest first

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use mkulima_core::conversation::StoredRole;
use mkulima_core::event::DomainEvent;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::SharedState;

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/sessions/{session_id}/messages", get(session_messages_handler))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

// ── Chat ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must not be empty"));
    }

    info!(
        user_id = ?payload.user_id,
        session_id = ?payload.session_id,
        chars = message.chars().count(),
        "Chat message received"
    );
    let sender = payload
        .user_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "anonymous".into());
    state
        .event_bus
        .publish(DomainEvent::message_received("api", &sender, message));

    let outcome = state
        .agent
        .respond(message, payload.user_id, payload.session_id)
        .await;

    Ok(Json(ChatResponse {
        response: outcome.reply,
        session_id: outcome.session_id,
    }))
}

// ── Sessions ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub role: StoredRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionMessagesResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub messages: Vec<MessageView>,
}

async fn session_messages_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionMessagesResponse>, ApiError> {
    let session = state.store.find_session(&session_id).await.map_err(|e| {
        error!(session_id, error = %e, "Session lookup failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load session")
    })?;
    let Some(session) = session else {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("session '{session_id}' not found"),
        ));
    };

    let history = state.store.history(&session_id, None).await.map_err(|e| {
        error!(session_id, error = %e, "History lookup failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load messages")
    })?;

    Ok(Json(SessionMessagesResponse {
        session_id: session.session_id,
        title: session.title,
        messages: history
            .into_iter()
            .map(|m| MessageView {
                role: m.role,
                content: m.content,
                metadata: m.metadata,
                timestamp: m.timestamp,
            })
            .collect(),
    }))
}
