//! Query classifier: one model call that labels the farmer's question.
//!
//! Best effort. Any failure (provider error, timeout, unparsable reply)
//! yields the default classification and the turn carries on.

use mkulima_core::agent::{KNOWN_CATEGORIES, QueryClassification};
use mkulima_core::message::Message;
use mkulima_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct QueryClassifier {
    provider: Arc<dyn Provider>,
    model: String,
    timeout: Duration,
}

impl QueryClassifier {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Label `query`. Makes exactly one model call and never fails.
    pub async fn classify(&self, query: &str) -> QueryClassification {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(instruction()), Message::user(query)],
            temperature: 0.0,
            max_tokens: Some(150),
            tools: vec![],
        };

        let reply = match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => response.message.content,
            Ok(Err(e)) => {
                warn!(error = %e, "Classifier call failed, using default classification");
                return QueryClassification::default();
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Classifier timed out, using default classification"
                );
                return QueryClassification::default();
            }
        };

        match parse_classification(&reply) {
            Some(c) => {
                debug!(category = %c.category, confidence = c.confidence, "Query classified");
                c
            }
            None => {
                warn!(reply = %reply, "Unparsable classifier reply, using default classification");
                QueryClassification::default()
            }
        }
    }
}

fn instruction() -> String {
    format!(
        "You classify questions from smallholder farmers in Kenya.\n\
         Reply with ONLY a JSON object, no prose and no code fences, shaped exactly like:\n\
         {{\"category\": \"<one of: {}>\", \"confidence\": <number 0-1>, \
         \"requires_farm_data\": <true if the answer depends on the farmer's own crops, animals or land>, \
         \"specific_subject\": \"<main crop, animal or topic, or null>\"}}",
        KNOWN_CATEGORIES.join(", ")
    )
}

/// Parse a classifier reply, tolerating code fences and chatter around the
/// JSON object.
pub fn parse_classification(reply: &str) -> Option<QueryClassification> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str::<QueryClassification>(&reply[start..=end])
        .ok()
        .map(QueryClassification::normalized)
}
