//! HTTP API gateway for Mkulima Smart.
//!
//! Exposes the service descriptor, health check, farming tips, the inbound
//! SMS callback and the v1 chat/session API.
//!
//! Built on Axum; every collaborator is constructed once in [`build_state`]
//! and shared through `Arc`.

pub mod api_v1;
pub mod sms;
pub mod tips;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use mkulima_agent::AdvisoryAgent;
use mkulima_config::AppConfig;
use mkulima_core::conversation::ConversationStore;
use mkulima_core::event::{DomainEvent, EventBus};
use mkulima_core::farm::UserDirectory;
use mkulima_core::sms::SmsGateway;
use mkulima_store::SqliteStore;

/// Inbound SMS and chat bodies are small; anything larger is rejected.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

const SERVICE_NAME: &str = "Mkulima Smart SMS API";

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<AdvisoryAgent>,
    pub users: Arc<dyn UserDirectory>,
    pub store: Arc<dyn ConversationStore>,
    pub sms: Arc<dyn SmsGateway>,
    pub event_bus: Arc<EventBus>,
}

pub type SharedState = Arc<GatewayState>;

/// Open the database and wire the agent, tools and SMS gateway from
/// configuration.
pub async fn build_state(config: &AppConfig) -> mkulima_core::Result<SharedState> {
    let store = Arc::new(SqliteStore::from_config(&config.database).await?);
    let provider = mkulima_providers::build_from_config(config)?;
    let tools = Arc::new(mkulima_tools::default_registry(&config.tools));
    let event_bus = Arc::new(EventBus::default());

    let agent = AdvisoryAgent::new(
        provider,
        config.default_model.clone(),
        tools,
        store.clone(),
        store.clone(),
        store.clone(),
        event_bus.clone(),
    )
    .with_config(config);

    Ok(Arc::new(GatewayState {
        agent: Arc::new(agent),
        users: store.clone(),
        store,
        sms: mkulima_channels::gateway_from_config(&config.sms),
        event_bus,
    }))
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/farming/tips", get(tips::tips_handler))
        .route("/sms/callback", post(sms::sms_callback_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = build_state(&config).await?;
    spawn_event_logger(state.event_bus.clone());
    info!(
        model = %config.default_model,
        sms_gateway = state.sms.name(),
        "Agent ready"
    );

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log every domain event until the bus is dropped.
pub fn spawn_event_logger(bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &DomainEvent) {
    match event {
        DomainEvent::MessageReceived {
            channel, sender_id, ..
        } => info!(kind = event.kind(), channel, sender_id, "event"),
        DomainEvent::ResponseGenerated {
            session_id,
            model,
            tokens_used,
            tool_rounds,
            ..
        } => info!(
            kind = event.kind(),
            session_id,
            model,
            tokens_used,
            tool_rounds,
            "event"
        ),
        DomainEvent::ToolExecuted {
            tool_name,
            success,
            duration_ms,
            ..
        } => debug!(kind = event.kind(), tool_name, success, duration_ms, "event"),
        DomainEvent::TurnPersisted { session_id, .. } => {
            debug!(kind = event.kind(), session_id, "event")
        }
        DomainEvent::ErrorOccurred {
            context,
            error_message,
            ..
        } => warn!(kind = event.kind(), context, error_message, "event"),
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct IndexResponse {
    message: &'static str,
    version: &'static str,
    description: &'static str,
    endpoints: serde_json::Value,
}

async fn index_handler() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        description: "SMS-based farming advice over Africa's Talking and an LLM agent",
        endpoints: serde_json::json!({
            "health": "/health",
            "farming_tips": "/farming/tips",
            "sms_callback": "/sms/callback",
            "chat": "/v1/chat",
            "session_messages": "/v1/sessions/{session_id}/messages",
        }),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use mkulima_core::error::{ChannelError, ProviderError};
    use mkulima_core::message::Message;
    use mkulima_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use mkulima_core::tool::ToolRegistry;
    use mkulima_store::InMemoryStore;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Answers every call with the same text. The classifier cannot parse
    /// it and falls back to the default category.
    struct FixedProvider(&'static str);

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant(self.0),
                usage: None,
                model: "fixed-model".into(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingSms {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl SmsGateway for RecordingSms {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, to: &str, text: &str) -> Result<(), ChannelError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), text.to_string()));
            Ok(())
        }
    }

    struct Harness {
        state: SharedState,
        store: InMemoryStore,
        sms: Arc<RecordingSms>,
    }

    fn harness(reply: &'static str) -> Harness {
        let store = InMemoryStore::new();
        let sms = Arc::new(RecordingSms::default());
        let event_bus = Arc::new(EventBus::default());
        let agent = AdvisoryAgent::new(
            Arc::new(FixedProvider(reply)),
            "fixed-model",
            Arc::new(ToolRegistry::new()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            event_bus.clone(),
        );
        let state = Arc::new(GatewayState {
            agent: Arc::new(agent),
            users: Arc::new(store.clone()),
            store: Arc::new(store.clone()),
            sms: sms.clone(),
            event_bus,
        });
        Harness { state, store, sms }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn sms_request(form: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/sms/callback")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap()
    }

    fn chat_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(harness("ok").state);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], SERVICE_NAME);
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let app = build_router(harness("ok").state);
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();

        let json = body_json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(json["endpoints"]["sms_callback"], "/sms/callback");
    }

    #[tokio::test]
    async fn tips_fall_back_to_general() {
        let app = build_router(harness("ok").state);
        let req = Request::builder()
            .uri("/farming/tips?category=beekeeping")
            .body(Body::empty())
            .unwrap();

        let json = body_json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(json["category"], "beekeeping");
        assert_eq!(json["tips"][0], tips::tips_for("general")[0]);

        let app = build_router(harness("ok").state);
        let req = Request::builder()
            .uri("/farming/tips")
            .body(Body::empty())
            .unwrap();
        let json = body_json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(json["category"], "general");
    }

    #[tokio::test]
    async fn sms_callback_replies_once_in_sender_session() {
        let h = harness("Plant maize after the first rains.");
        let farmer = h
            .store
            .register("wanjiku", Some("+254700000001"))
            .await
            .unwrap();
        let app = build_router(h.state.clone());

        let response = app
            .oneshot(sms_request(
                "from=%2B254700000001&text=When+should+I+plant%3F&to=12345&id=ATXid_1&linkId=abc&date=2026-10-19",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Plant maize after the first rains.");

        let sent = h.sms.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![(
                "+254700000001".to_string(),
                "Plant maize after the first rains.".to_string()
            )]
        );

        let session = h
            .store
            .find_session("sms:+254700000001")
            .await
            .unwrap()
            .expect("session persisted");
        assert_eq!(session.user_id, Some(farmer.id));
        assert_eq!(h.store.message_count().await, 2);
    }

    #[tokio::test]
    async fn sms_callback_rejects_empty_text() {
        let h = harness("unused");
        let app = build_router(h.state.clone());

        let response = app
            .oneshot(sms_request("from=%2B254700000001&text=+++"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.sms.sent.lock().unwrap().is_empty());
        assert_eq!(h.store.message_count().await, 0);
    }

    #[tokio::test]
    async fn chat_then_read_session_history() {
        let h = harness("Use certified seed.");
        let app = build_router(h.state.clone());

        let response = app
            .clone()
            .oneshot(chat_request(serde_json::json!({
                "message": "Which seed should I buy?",
                "user_id": 7
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["response"], "Use certified seed.");
        let session_id = json["session_id"].as_str().unwrap().to_string();
        assert!(!session_id.is_empty());

        let req = Request::builder()
            .uri(format!("/v1/sessions/{session_id}/messages"))
            .body(Body::empty())
            .unwrap();
        let json = body_json(app.oneshot(req).await.unwrap()).await;
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "Which seed should I buy?");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(
            messages[1]["metadata"]["classification"]["category"],
            "general_farming"
        );
    }

    #[tokio::test]
    async fn chat_rejects_blank_message() {
        let app = build_router(harness("unused").state);
        let response = app
            .oneshot(chat_request(serde_json::json!({ "message": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = build_router(harness("unused").state);
        let req = Request::builder()
            .uri("/v1/sessions/nope/messages")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = build_router(harness("unused").state);
        let text = "a".repeat(MAX_BODY_BYTES + 1);
        let response = app
            .oneshot(sms_request(&format!("from=%2B254700000001&text={text}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
