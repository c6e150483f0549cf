//! Tool trait — capabilities the model may call mid-conversation.
//!
//! The registry is the fixed capability list: only calls whose name is
//! registered are ever dispatched, and a dispatched call always yields a
//! [`ToolResult`] (failures become text the model can read).

use crate::error::ToolError;
use crate::message::MessageToolCall;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

/// A parsed, dispatchable tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Matches the model's tool_call id
    pub id: String,

    pub name: String,

    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Parse a call as the model issued it. Malformed argument JSON becomes
    /// an empty object so the tool reports the missing fields itself.
    pub fn from_request(call: &MessageToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: serde_json::from_str(&call.arguments)
                .unwrap_or_else(|_| serde_json::json!({})),
        }
    }
}

/// What a tool hands back to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,

    /// Whether the tool got what it was asked for
    pub success: bool,

    /// Fed back to the model verbatim
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            success: true,
            output: output.into(),
        }
    }

    /// A readable failure. Tools report problems this way rather than
    /// erroring so the model can still answer.
    pub fn degraded(output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            success: false,
            output: output.into(),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_weather").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Registered tools, keyed and ordered by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Split model-issued calls into those naming a registered tool and the
    /// names of those that do not.
    pub fn partition_known(
        &self,
        calls: Vec<MessageToolCall>,
    ) -> (Vec<MessageToolCall>, Vec<String>) {
        let (known, unknown): (Vec<_>, Vec<_>) =
            calls.into_iter().partition(|c| self.contains(&c.name));
        (known, unknown.into_iter().map(|c| c.name).collect())
    }

    /// Run one call. The result carries the call's id.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let mut result = tool.execute(call.arguments.clone()).await?;
        result.call_id = call.id.clone();
        Ok(result)
    }

    /// Run one call within `timeout`. Errors and timeouts come back as a
    /// degraded result; this never fails.
    pub async fn dispatch(&self, call: &ToolCall, timeout: Duration) -> ToolResult {
        let outcome = match tokio::time::timeout(timeout, self.execute(call)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolError::Timeout {
                tool_name: call.name.clone(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        outcome.unwrap_or_else(|e| {
            warn!(tool = %call.name, error = %e, "Tool call failed");
            let mut result = ToolResult::degraded(format!("Error: {e}"));
            result.call_id = call.id.clone();
            result
        })
    }
}
