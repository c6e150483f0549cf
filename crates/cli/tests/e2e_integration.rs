//! End-to-end tests for the SMS advisory pipeline.
//!
//! A farmer's SMS goes in through the HTTP callback, runs the full workflow
//! (classification, knowledge lookup, weather tool round trip, answer), is
//! persisted, and exactly one reply goes out through the SMS gateway.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use mkulima_agent::AdvisoryAgent;
use mkulima_core::agent::ContextBag;
use mkulima_core::conversation::{ConversationStore, StoredRole};
use mkulima_core::error::{ChannelError, ProviderError, ToolError};
use mkulima_core::event::EventBus;
use mkulima_core::farm::UserDirectory;
use mkulima_core::message::{Message, MessageToolCall, Role};
use mkulima_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use mkulima_core::sms::SmsGateway;
use mkulima_core::tool::ToolRegistry;
use mkulima_gateway::{GatewayState, build_router};
use mkulima_store::{InMemoryStore, seed_knowledge};
use mkulima_tools::{WeatherApi, WeatherLookupTool, WeatherReading};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence and keeps
/// the requests it saw.
struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = requests.len();
        if call >= responses.len() {
            panic!(
                "ScriptedProvider exhausted: call #{}, have {}",
                call,
                responses.len()
            );
        }
        requests.push(request);
        Ok(responses[call].clone())
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut message = Message::assistant("");
    message.tool_calls = tool_calls;
    ProviderResponse {
        message,
        usage: None,
        model: "mock-model".into(),
    }
}

// ── Fakes ────────────────────────────────────────────────────────────────

struct EldoretWeather;

#[async_trait::async_trait]
impl WeatherApi for EldoretWeather {
    async fn current(&self, location: &str) -> Result<WeatherReading, ToolError> {
        Ok(WeatherReading {
            city: location.into(),
            temp_c: 18.04,
            condition: "light rain".into(),
        })
    }

    async fn forecast(&self, location: &str) -> Result<WeatherReading, ToolError> {
        Ok(WeatherReading {
            city: location.into(),
            temp_c: 16.96,
            condition: "moderate rain".into(),
        })
    }
}

#[derive(Default)]
struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
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

struct Pipeline {
    app: axum::Router,
    store: InMemoryStore,
    sms: Arc<RecordingSms>,
    provider: Arc<ScriptedProvider>,
}

async fn pipeline(responses: Vec<ProviderResponse>) -> Pipeline {
    let store = InMemoryStore::new();
    seed_knowledge(&store).await.unwrap();

    let mut tools = ToolRegistry::new();
    tools.register(Box::new(WeatherLookupTool::new(Arc::new(EldoretWeather))));

    let provider = Arc::new(ScriptedProvider::new(responses));
    let sms = Arc::new(RecordingSms::default());
    let event_bus = Arc::new(EventBus::default());
    let agent = AdvisoryAgent::new(
        provider.clone(),
        "mock-model",
        Arc::new(tools),
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

    Pipeline {
        app: build_router(state),
        store,
        sms,
        provider,
    }
}

fn sms_callback(from: &str, text: &str) -> Request<Body> {
    let form = format!(
        "from={}&text={}&to=40404&id=ATXid_e2e",
        from.replace('+', "%2B"),
        text.replace(' ', "+").replace('?', "%3F")
    );
    Request::builder()
        .method("POST")
        .uri("/sms/callback")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn eldoret_weather_question_round_trip() {
    let farmer = "+254711000222";
    let p = pipeline(vec![
        text_response(
            r#"{"category": "weather_advice", "confidence": 0.92, "requires_farm_data": false, "specific_subject": "rain"}"#,
        ),
        tool_response(vec![MessageToolCall {
            id: "call_1".into(),
            name: "get_weather".into(),
            arguments: r#"{"location": "Eldoret"}"#.into(),
        }]),
        text_response("*Light rain* in Eldoret today. Good week to plant beans."),
    ])
    .await;

    let response = p
        .app
        .clone()
        .oneshot(sms_callback(farmer, "Will it rain in Eldoret this week?"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reply = body_text(response).await;
    assert!(reply.contains("Eldoret"));

    // Exactly one SMS, asterisks left for the gateway adapter to strip.
    let sent = p.sms.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, farmer);
    assert_eq!(sent[0].1, reply);

    // The second model call carried the tool result into the conversation.
    let requests = p.provider.requests();
    assert_eq!(requests.len(), 3);
    let tool_message = requests[2]
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool result sent back to the model");
    assert_eq!(
        tool_message.content,
        "Weather in Eldoret: 18°C, light rain. Next: 17°C, moderate rain."
    );

    // The system prompt carried weather knowledge from the seeded base.
    let system = &requests[1].messages[0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.contains("RELEVANT KNOWLEDGE"));

    // One user + one assistant message persisted under the sender's session.
    let history = p
        .store
        .history(&format!("sms:{farmer}"), None)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, StoredRole::User);
    assert_eq!(history[1].role, StoredRole::Assistant);
    assert!(history[0].timestamp <= history[1].timestamp);

    let bag = ContextBag::from_metadata(history[1].metadata.as_ref().unwrap()).unwrap();
    assert_eq!(bag.classification.unwrap().category, "weather_advice");
    assert!(bag.farms.is_none());
    assert!(!bag.knowledge.is_empty());
}

#[tokio::test]
async fn follow_up_sms_sees_previous_turn() {
    let farmer = "+254711000333";
    let p = pipeline(vec![
        text_response(r#"{"category": "crop_management", "confidence": 0.8}"#),
        text_response("Plant H614 maize at the onset of the long rains."),
        text_response(r#"{"category": "crop_management", "confidence": 0.8}"#),
        text_response("Space rows 75 cm apart."),
    ])
    .await;
    p.store.register("kiprop", Some(farmer)).await.unwrap();

    for question in ["Which maize should I plant?", "How far apart?"] {
        let response = p
            .app
            .clone()
            .oneshot(sms_callback(farmer, question))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let requests = p.provider.requests();
    let second_answer = &requests[3];
    let contents: Vec<&str> = second_answer
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert!(contents.contains(&"Which maize should I plant?"));
    assert!(contents.contains(&"Plant H614 maize at the onset of the long rains."));
    assert_eq!(contents.last(), Some(&"How far apart?"));

    assert_eq!(p.sms.sent.lock().unwrap().len(), 2);
    assert_eq!(p.store.message_count().await, 4);
    assert_eq!(p.store.session_count().await, 1);
}
