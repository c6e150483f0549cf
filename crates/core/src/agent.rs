//! Per-turn agent state and the records it accumulates.

use crate::farm::{FarmSnapshot, KnowledgeEntry};
use crate::message::{Message, Role};
use serde::{Deserialize, Serialize};

/// Category used whenever classification is unavailable.
pub const DEFAULT_CATEGORY: &str = "general_farming";

/// Confidence reported for the fallback classification.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Labels the classifier prompt offers the model.
pub const KNOWN_CATEGORIES: [&str; 7] = [
    "crop_management",
    "livestock",
    "weather_advice",
    "pest_disease",
    "soil_health",
    "market_prices",
    DEFAULT_CATEGORY,
];

/// What the farmer is asking about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryClassification {
    pub category: String,
    pub confidence: f32,
    #[serde(default)]
    pub requires_farm_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_subject: Option<String>,
}

impl Default for QueryClassification {
    fn default() -> Self {
        Self {
            category: DEFAULT_CATEGORY.into(),
            confidence: DEFAULT_CONFIDENCE,
            requires_farm_data: false,
            specific_subject: None,
        }
    }
}

impl QueryClassification {
    /// Trim and lowercase the label, clamp confidence into `[0, 1]`.
    ///
    /// An empty label falls back to the default category; a non-finite
    /// confidence falls back to the default confidence.
    pub fn normalized(mut self) -> Self {
        self.category = self.category.trim().to_lowercase();
        if self.category.is_empty() {
            self.category = DEFAULT_CATEGORY.into();
        }
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            DEFAULT_CONFIDENCE
        };
        self.specific_subject = self
            .specific_subject
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    pub fn is_known_category(&self) -> bool {
        KNOWN_CATEGORIES.contains(&self.category.as_str())
    }
}

/// Turn-scoped key-value context: classifier output plus fetched data.
///
/// Serialized as a JSON object and persisted as the assistant message's
/// metadata, so it must deserialize back to the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextBag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<QueryClassification>,

    /// Present only when the classifier asked for farm data and the user
    /// is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farms: Option<Vec<FarmSnapshot>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub knowledge: Vec<KnowledgeEntry>,
}

impl ContextBag {
    pub fn has_farms(&self) -> bool {
        self.farms.as_ref().is_some_and(|f| !f.is_empty())
    }

    pub fn to_metadata(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub fn from_metadata(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

/// Mutable record threaded through every workflow step.
///
/// Created fresh per inbound message and dropped once the reply has been
/// extracted; only the persisted turn outlives it.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    /// Conversation so far: prior history plus the new user message. The
    /// workflow appends exactly one assistant message.
    pub messages: Vec<Message>,

    pub user_id: Option<i64>,

    pub session_id: Option<String>,

    pub context: ContextBag,

    pub farm_data: Option<Vec<FarmSnapshot>>,

    /// Assistant tool-call requests and tool results of the current turn.
    pub tool_exchange: Vec<Message>,

    /// Completed tool rounds this turn.
    pub tool_rounds: u32,
}

impl AgentState {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// The message that triggered this turn.
    pub fn latest_user_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }

    /// The first thing the farmer said in this session (used for titles).
    pub fn first_user_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.role == Role::User)
    }

    /// Text of the final assistant message, if one has been appended.
    pub fn final_answer(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }
}
