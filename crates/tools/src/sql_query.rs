//! SQL query tool — the model's handle on the relational backend.

use async_trait::async_trait;
use plantline_backends::BackendAdapter;
use plantline_core::error::ToolError;
use plantline_core::tool::Tool;
use std::sync::Arc;
use tracing::debug;

pub struct SqlQueryTool {
    adapter: Arc<dyn BackendAdapter>,
    referenced: Vec<String>,
}

impl SqlQueryTool {
    pub fn new(adapter: Arc<dyn BackendAdapter>) -> Self {
        Self {
            adapter,
            referenced: Vec::new(),
        }
    }

    /// Declare the backend tables this tool's description relies on; the
    /// dispatcher verifies them against the live schema.
    pub fn with_referenced_entities(mut self, entities: Vec<String>) -> Self {
        self.referenced = entities;
        self
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        "sql_query"
    }

    fn description(&self) -> &str {
        "Execute a read-only SQL query against the plant's PostgreSQL database \
         (production volumes, process measurements, shift logs, nonconformity \
         records, quality checks). Input must be exactly one SELECT statement \
         as plain text, without markdown fences or backticks. Results are \
         returned as a JSON array of rows."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A single read-only SQL SELECT statement to execute"
                }
            },
            "required": ["query"]
        })
    }

    fn referenced_entities(&self) -> Vec<String> {
        self.referenced.clone()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<(String, u32), ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        debug!(backend = self.adapter.name(), "Running sql_query");

        let retried = self
            .adapter
            .execute(query)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "sql_query".into(),
                reason: e.error.to_string(),
                retries: e.retries,
            })?;

        Ok((retried.value, retried.retries))
    }
}
