//! The advisory workflow: a small state machine run once per inbound message.
//!
//! ```text
//! Classify -> FetchContext -> ComposeAndInvoke -+-> Persist -> Done
//!                                  ^            |
//!                                  |            +-> ExecuteTools
//!                                  +----------------------+
//! ```
//!
//! Tool rounds are counted on the state. Once `max_tool_rounds` is reached
//! the model is invoked without tool definitions, so the loop always ends.
//! A failed model call appends the apology and goes straight to `Done`.

use crate::classifier::QueryClassifier;
use crate::context::ContextFetcher;
use crate::persistence::TurnPersister;
use crate::prompt::PromptComposer;
use chrono::Utc;
use mkulima_config::AppConfig;
use mkulima_core::agent::{AgentState, ContextBag, QueryClassification};
use mkulima_core::conversation::{ConversationStore, StoredRole};
use mkulima_core::event::{DomainEvent, EventBus};
use mkulima_core::farm::{FarmRecords, KnowledgeBase};
use mkulima_core::message::Message;
use mkulima_core::provider::{Provider, ProviderRequest};
use mkulima_core::tool::{ToolCall, ToolRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// The only failure text a farmer ever sees.
pub const APOLOGY: &str =
    "Sorry, I couldn't process your request right now. Please try again later.";

/// Workflow position. Each variant names the step about to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Classify,
    FetchContext,
    ComposeAndInvoke,
    ExecuteTools,
    Persist,
    Done,
}

/// What a caller gets back from one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub session_id: String,
    pub classification: QueryClassification,
    pub tool_rounds: u32,
}

/// The advisory agent: every collaborator is injected once and shared
/// across concurrent turns.
pub struct AdvisoryAgent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    classifier: QueryClassifier,
    fetcher: ContextFetcher,
    composer: PromptComposer,
    persister: TurnPersister,
    event_bus: Arc<EventBus>,
    max_tool_rounds: u32,
    history_window: usize,
    model_timeout: Duration,
    tool_timeout: Duration,
}

impl AdvisoryAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        knowledge: Arc<dyn KnowledgeBase>,
        farms: Arc<dyn FarmRecords>,
        store: Arc<dyn ConversationStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let model = model.into();
        Self {
            classifier: QueryClassifier::new(provider.clone(), model.clone(), Duration::from_secs(15)),
            provider,
            model,
            temperature: 0.3,
            max_tokens: None,
            tools,
            fetcher: ContextFetcher::new(knowledge, farms),
            composer: PromptComposer::default(),
            persister: TurnPersister::new(store, Duration::from_secs(5)),
            event_bus,
            max_tool_rounds: 3,
            history_window: 5,
            model_timeout: Duration::from_secs(45),
            tool_timeout: Duration::from_secs(21),
        }
    }

    /// Apply model, agent and tool settings from configuration.
    pub fn with_config(self, config: &AppConfig) -> Self {
        let agent = &config.agent;
        self.with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_max_tool_rounds(agent.max_tool_rounds)
            .with_history_window(agent.history_window)
            .with_classifier_timeout(Duration::from_secs(agent.classifier_timeout_secs))
            .with_model_timeout(Duration::from_secs(agent.model_timeout_secs))
            .with_persist_timeout(Duration::from_secs(agent.persist_timeout_secs))
            .with_tool_timeout(config.tools.dispatch_timeout())
            .with_composer(PromptComposer::with_override(agent.persona_override.as_deref()))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the maximum number of tool rounds per turn.
    pub fn with_max_tool_rounds(mut self, max: u32) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// How many recent conversation messages the model sees.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.max(1);
        self
    }

    pub fn with_classifier_timeout(mut self, timeout: Duration) -> Self {
        self.classifier = self.classifier.with_timeout(timeout);
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persister = TurnPersister::new(self.persister.store().clone(), timeout);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Answer one message within a session.
    ///
    /// Loads the session's recent history, runs the workflow and returns the
    /// reply. A session id is generated when none is given. Never fails: the
    /// worst case is the apology.
    pub async fn respond(
        &self,
        text: &str,
        user_id: Option<i64>,
        session_id: Option<String>,
    ) -> TurnOutcome {
        let session_id = session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut messages = self.load_history(&session_id).await;
        messages.push(Message::user(text));

        let state = AgentState::new(messages)
            .with_user(user_id)
            .with_session(Some(session_id.clone()));
        let state = self.run(state).await;

        TurnOutcome {
            reply: state.final_answer().unwrap_or(APOLOGY).to_string(),
            session_id: state.session_id.unwrap_or(session_id),
            classification: state.context.classification.unwrap_or_default(),
            tool_rounds: state.tool_rounds,
        }
    }

    async fn load_history(&self, session_id: &str) -> Vec<Message> {
        let lookup = self
            .persister
            .store()
            .history(session_id, Some(self.history_window));
        match tokio::time::timeout(self.persister.timeout(), lookup).await {
            Ok(Ok(stored)) => stored
                .into_iter()
                .map(|m| {
                    let mut msg = match m.role {
                        StoredRole::User => Message::user(m.content),
                        StoredRole::Assistant => Message::assistant(m.content),
                    };
                    msg.timestamp = m.timestamp;
                    msg
                })
                .collect(),
            Ok(Err(e)) => {
                warn!(session_id, error = %e, "Could not load history, continuing without it");
                Vec::new()
            }
            Err(_) => {
                warn!(session_id, "Loading history timed out, continuing without it");
                Vec::new()
            }
        }
    }

    /// Drive `state` from `Classify` to `Done`.
    ///
    /// Appends exactly one assistant message to `state.messages`.
    pub async fn run(&self, mut state: AgentState) -> AgentState {
        if state.latest_user_message().is_none() {
            warn!("Workflow started without a user message");
            state.messages.push(Message::assistant(APOLOGY));
            return state;
        }

        info!(
            session_id = state.session_id.as_deref().unwrap_or("-"),
            user_id = ?state.user_id,
            messages = state.messages.len(),
            "Processing turn"
        );

        let mut step = Step::Classify;
        while step != Step::Done {
            debug!(?step, tool_rounds = state.tool_rounds, "Workflow step");
            step = match step {
                Step::Classify => self.classify(&mut state).await,
                Step::FetchContext => self.fetch_context(&mut state).await,
                Step::ComposeAndInvoke => self.compose_and_invoke(&mut state).await,
                Step::ExecuteTools => self.execute_tools(&mut state).await,
                Step::Persist => self.persist(&mut state).await,
                Step::Done => Step::Done,
            };
        }
        state
    }

    async fn classify(&self, state: &mut AgentState) -> Step {
        let query = state
            .latest_user_message()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        state.context.classification = Some(self.classifier.classify(&query).await);
        Step::FetchContext
    }

    async fn fetch_context(&self, state: &mut AgentState) -> Step {
        let classification = state.context.classification.clone().unwrap_or_default();
        let bag = self.fetcher.fetch(&classification, state.user_id).await;
        state.farm_data = bag.farms.clone();
        state.context = ContextBag {
            classification: Some(classification),
            ..bag
        };
        Step::ComposeAndInvoke
    }

    /// System message plus the recent window plus this turn's tool exchange.
    fn model_input(&self, state: &AgentState) -> Vec<Message> {
        let start = state.messages.len().saturating_sub(self.history_window);
        let mut input = Vec::with_capacity(1 + self.history_window + state.tool_exchange.len());
        input.push(Message::system(self.composer.compose(&state.context)));
        input.extend(state.messages[start..].iter().cloned());
        input.extend(state.tool_exchange.iter().cloned());
        input
    }

    async fn compose_and_invoke(&self, state: &mut AgentState) -> Step {
        let offer_tools = state.tool_rounds < self.max_tool_rounds && !self.tools.is_empty();
        if !offer_tools && state.tool_rounds > 0 {
            debug!(tool_rounds = state.tool_rounds, "Tool rounds exhausted, asking for a final answer");
        }

        let request = ProviderRequest {
            model: self.model.clone(),
            messages: self.model_input(state),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: if offer_tools {
                self.tools.definitions()
            } else {
                vec![]
            },
        };

        let response =
            match tokio::time::timeout(self.model_timeout, self.provider.complete(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return self.fail_turn(state, e.to_string()),
                Err(_) => {
                    return self.fail_turn(
                        state,
                        format!("model call timed out after {}s", self.model_timeout.as_secs()),
                    );
                }
            };

        let mut message = response.message;
        let requested = std::mem::take(&mut message.tool_calls);
        let (dispatchable, unknown) = self.tools.partition_known(requested);
        if !unknown.is_empty() {
            warn!(tools = ?unknown, "Model asked for unregistered tools");
        }

        if offer_tools && !dispatchable.is_empty() {
            message.tool_calls = dispatchable;
            state.tool_exchange.push(message);
            return Step::ExecuteTools;
        }

        if !dispatchable.is_empty() {
            warn!(
                requested = dispatchable.len(),
                "Tool rounds exhausted, treating reply as the answer"
            );
        }

        let answer = message.content.trim();
        let answer = if answer.is_empty() { APOLOGY } else { answer };

        self.event_bus.publish(DomainEvent::ResponseGenerated {
            session_id: state.session_id.clone().unwrap_or_default(),
            model: response.model,
            tokens_used: response.usage.map_or(0, |u| u.total_tokens),
            tool_rounds: state.tool_rounds,
            timestamp: Utc::now(),
        });

        state.messages.push(Message::assistant(answer));
        Step::Persist
    }

    fn fail_turn(&self, state: &mut AgentState, reason: String) -> Step {
        error!(
            session_id = state.session_id.as_deref().unwrap_or("-"),
            error = %reason,
            "Model invocation failed, replying with apology"
        );
        self.event_bus.publish(DomainEvent::ErrorOccurred {
            context: "model".into(),
            error_message: reason,
            timestamp: Utc::now(),
        });
        state.messages.push(Message::assistant(APOLOGY));
        Step::Done
    }

    async fn execute_tools(&self, state: &mut AgentState) -> Step {
        let Some(request) = state
            .tool_exchange
            .last()
            .filter(|m| m.requests_tools())
            .cloned()
        else {
            return Step::ComposeAndInvoke;
        };

        for requested in &request.tool_calls {
            let call = ToolCall::from_request(requested);

            let start = Instant::now();
            let result = self.tools.dispatch(&call, self.tool_timeout).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            debug!(tool = %call.name, success = result.success, duration_ms, "Tool executed");
            self.event_bus.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success: result.success,
                duration_ms,
                timestamp: Utc::now(),
            });

            state
                .tool_exchange
                .push(Message::tool_result(result.call_id, result.output));
        }

        state.tool_rounds += 1;
        Step::ComposeAndInvoke
    }

    async fn persist(&self, state: &mut AgentState) -> Step {
        if self.persister.persist(state).await {
            self.event_bus.publish(DomainEvent::TurnPersisted {
                session_id: state.session_id.clone().unwrap_or_default(),
                timestamp: Utc::now(),
            });
        } else {
            self.event_bus.publish(DomainEvent::ErrorOccurred {
                context: "persistence".into(),
                error_message: "turn was not persisted".into(),
                timestamp: Utc::now(),
            });
        }
        Step::Done
    }
}
