//! Shared test doubles for workflow tests.

use async_trait::async_trait;
use mkulima_core::conversation::{ChatSession, ConversationStore, StoredMessage, TurnRecord};
use mkulima_core::error::{ProviderError, StoreError};
use mkulima_core::farm::{FarmRecords, FarmSnapshot, KnowledgeBase, KnowledgeEntry};
use mkulima_core::message::{Message, MessageToolCall};
use mkulima_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns a sequence of scripted responses and keeps
/// every request it was sent.
///
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    /// Like `new`, but individual calls may fail.
    pub fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = requests.len();

        if call >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                call,
                responses.len()
            );
        }

        requests.push(request);
        responses[call].clone()
    }
}

/// A provider whose every call fails.
pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// A provider that answers only after `delay`.
pub struct SlowProvider {
    delay: Duration,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Provider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(make_text_response("too late"))
    }
}

/// Every store trait, always failing.
pub struct FailingStore;

fn down() -> StoreError {
    StoreError::Storage("database is locked".into())
}

#[async_trait]
impl KnowledgeBase for FailingStore {
    async fn find_active_by_category(
        &self,
        _category_fragment: &str,
        _limit: usize,
    ) -> Result<Vec<KnowledgeEntry>, StoreError> {
        Err(down())
    }

    async fn add_entry(&self, _entry: KnowledgeEntry) -> Result<i64, StoreError> {
        Err(down())
    }
}

#[async_trait]
impl FarmRecords for FailingStore {
    async fn farms_for_user(&self, _user_id: i64) -> Result<Vec<FarmSnapshot>, StoreError> {
        Err(down())
    }

    async fn add_farm(&self, _user_id: i64, _farm: FarmSnapshot) -> Result<i64, StoreError> {
        Err(down())
    }
}

#[async_trait]
impl ConversationStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn record_turn(&self, _turn: TurnRecord) -> Result<(), StoreError> {
        Err(StoreError::Transaction("rolled back".into()))
    }

    async fn find_session(&self, _session_id: &str) -> Result<Option<ChatSession>, StoreError> {
        Err(down())
    }

    async fn history(
        &self,
        _session_id: &str,
        _limit: Option<usize>,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        Err(down())
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
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

/// Create a response that asks for tools.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// A canned classifier reply.
pub fn classification_json(category: &str, requires_farm_data: bool) -> ProviderResponse {
    make_text_response(&format!(
        r#"{{"category": "{category}", "confidence": 0.9, "requires_farm_data": {requires_farm_data}}}"#
    ))
}
