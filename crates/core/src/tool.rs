//! Tool trait, registry, and dispatcher.
//!
//! Tools are the agent's only way to retrieve plant data: each one turns a
//! model-generated query into a backend invocation. The registry maps a tool
//! name to `{schema, handler}`; dispatch is a lookup plus schema validation,
//! never reflection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use crate::schema::validate_arguments;

/// A request to execute a tool, as issued by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The outcome of one dispatched tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content (query results, or an error description the model
    /// can act on)
    pub output: String,

    /// How many retries the backing adapter performed before this outcome
    #[serde(default)]
    pub retries: u32,
}

impl ToolResult {
    /// A successful result.
    pub fn ok(call_id: impl Into<String>, output: impl Into<String>, retries: u32) -> Self {
        Self {
            call_id: call_id.into(),
            success: true,
            output: output.into(),
            retries,
        }
    }

    /// A failed result carrying an error description for the model.
    pub fn error(call_id: impl Into<String>, description: impl Into<String>, retries: u32) -> Self {
        Self {
            call_id: call_id.into(),
            success: false,
            output: description.into(),
            retries,
        }
    }
}

/// The core Tool trait.
///
/// Each data-retrieval capability (relational query, graph query) implements
/// this trait. Tools are registered in the ToolRegistry and surfaced to the
/// model as definitions.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "sql_query").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model so it can
    /// decide applicability).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Backend entities (table names, node labels) this tool's declaration
    /// depends on. Checked against the live schema at dispatch time; an
    /// empty list opts out of the check.
    fn referenced_entities(&self) -> Vec<String> {
        Vec::new()
    }

    /// Execute the tool with schema-valid arguments.
    ///
    /// Returns the output text plus the retry count the adapter recorded.
    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<(String, u32), ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools, doubling as the dispatcher.
///
/// The agent controller uses this to:
/// 1. Get tool definitions to send to the model
/// 2. Validate and execute tool calls the model requests
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,

    /// Backend entity names observed at session initialization; used to
    /// detect drifted tool declarations before dispatch.
    known_entities: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            known_entities: Vec::new(),
        }
    }

    /// Record the backend entity names captured at session initialization.
    pub fn with_known_entities(mut self, entities: Vec<String>) -> Self {
        self.known_entities = entities;
        self
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Dispatch one tool call: validate, then execute.
    ///
    /// Validation always precedes execution — arguments that fail the
    /// declared schema (or reference a tool/entity the session does not
    /// know) never reach the adapter. Every failure mode is converted into
    /// a failed ToolResult so the model can self-correct; dispatch itself
    /// never aborts the answer cycle.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, "Dispatch requested for unregistered tool");
            return ToolResult::error(
                &call.id,
                format!(
                    "Unknown tool '{}'. Available tools: {}",
                    call.name,
                    self.tools.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
                0,
            );
        };

        if let Err(missing) = self.check_entities(tool.as_ref()) {
            let err = ToolError::SchemaDrift {
                tool_name: call.name.clone(),
                missing,
            };
            warn!(tool = %call.name, error = %err, "Tool declaration drifted from backend schema");
            return ToolResult::error(&call.id, format!("Validation error: {err}"), 0);
        }

        if let Err(reason) = validate_arguments(&tool.parameters_schema(), &call.arguments) {
            debug!(tool = %call.name, reason = %reason, "Tool arguments failed validation");
            return ToolResult::error(&call.id, format!("Validation error: {reason}"), 0);
        }

        match tool.execute(call.arguments.clone()).await {
            Ok((output, retries)) => ToolResult::ok(&call.id, output, retries),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                let retries = match &e {
                    ToolError::ExecutionFailed { retries, .. } => *retries,
                    _ => 0,
                };
                ToolResult::error(&call.id, format!("Error: {e}"), retries)
            }
        }
    }

    /// Verify the tool's declared backend entities against the session's
    /// known entity names (case-insensitive). An empty known set disables
    /// the check, so tests and plain registries are unaffected.
    fn check_entities(&self, tool: &dyn Tool) -> std::result::Result<(), String> {
        if self.known_entities.is_empty() {
            return Ok(());
        }
        let missing: Vec<String> = tool
            .referenced_entities()
            .into_iter()
            .filter(|e| {
                !self
                    .known_entities
                    .iter()
                    .any(|k| k.eq_ignore_ascii_case(e))
            })
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing.join(", "))
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
