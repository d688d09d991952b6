//! Graph adapter — executes Cypher against Neo4j's HTTP transactional API.
//!
//! The adapter consistently accepts a *direct Cypher statement* (never a
//! natural-language sub-question): with tool-calling models the main model
//! writes Cypher itself, which keeps this adapter symmetric with the
//! relational one.
//!
//! Schema introspection happens once at construction, the same way the
//! source system did it: `db.schema.nodeTypeProperties()` for node
//! properties, `db.labels()` / `db.relationshipTypes()` for the entity
//! inventory surfaced to the model.

use async_trait::async_trait;
use plantline_core::error::{BackendError, InitError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::retry::{with_retries, Exhausted, Retried};
use crate::BackendAdapter;

const BACKEND: &str = "neo4j";

/// Adapter over one Neo4j HTTP endpoint, constructed once per session.
pub struct GraphAdapter {
    client: reqwest::Client,
    commit_url: String,
    username: Option<String>,
    password: Option<String>,
    schema: String,
    entities: Vec<String>,
    max_attempts: u32,
    call_timeout: Duration,
}

impl GraphAdapter {
    /// Connect to the graph backend and introspect its schema.
    ///
    /// Fatal on failure, like the relational side: the session either has
    /// both backends or it does not start.
    pub async fn connect(
        base_url: &str,
        database: &str,
        username: Option<String>,
        password: Option<String>,
        max_attempts: u32,
        call_timeout: Duration,
    ) -> Result<Self, InitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| InitError::Graph(format!("HTTP client: {e}")))?;

        let commit_url = format!(
            "{}/db/{}/tx/commit",
            base_url.trim_end_matches('/'),
            database
        );

        let mut adapter = Self {
            client,
            commit_url,
            username,
            password,
            schema: String::new(),
            entities: Vec::new(),
            max_attempts,
            call_timeout,
        };

        // Connectivity check before any introspection.
        adapter
            .run_statement("RETURN 1")
            .await
            .map_err(|e| InitError::Graph(e.to_string()))?;

        let (schema, entities) = adapter.introspect().await.map_err(|e| {
            InitError::SchemaIntrospection {
                backend: BACKEND.into(),
                reason: e.to_string(),
            }
        })?;
        adapter.schema = schema;
        adapter.entities = entities;

        info!(entities = adapter.entities.len(), "Graph backend connected");
        Ok(adapter)
    }

    async fn introspect(&self) -> Result<(String, Vec<String>), BackendError> {
        let properties = self
            .run_statement(
                "CALL db.schema.nodeTypeProperties() \
                 YIELD nodeType, propertyName, propertyTypes \
                 RETURN nodeType, propertyName, propertyTypes",
            )
            .await?;
        let labels = self
            .run_statement("CALL db.labels() YIELD label RETURN label")
            .await?;
        let rel_types = self
            .run_statement(
                "CALL db.relationshipTypes() YIELD relationshipType RETURN relationshipType",
            )
            .await?;

        let label_names = string_column(&labels);
        let rel_names = string_column(&rel_types);

        let schema = format_schema(&properties, &rel_names);
        let mut entities = label_names;
        entities.extend(rel_names);

        Ok((schema, entities))
    }

    /// Execute one Cypher statement through the transactional endpoint.
    async fn run_statement(&self, cypher: &str) -> Result<TxResult, BackendError> {
        let body = TxRequest {
            statements: vec![TxStatement {
                statement: cypher.to_string(),
            }],
        };

        let mut request = self.client.post(&self.commit_url).json(&body);
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = tokio::time::timeout(self.call_timeout, request.send())
            .await
            .map_err(|_| BackendError::Timeout {
                backend: BACKEND.into(),
                timeout_secs: self.call_timeout.as_secs(),
            })?
            .map_err(|e| BackendError::Connection {
                backend: BACKEND.into(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(BackendError::QueryFailed {
                backend: BACKEND.into(),
                reason: format!("HTTP {status}: {text}"),
            });
        }

        let tx: TxResponse = response.json().await.map_err(|e| BackendError::QueryFailed {
            backend: BACKEND.into(),
            reason: format!("malformed response: {e}"),
        })?;

        first_result(tx)
    }
}

#[async_trait]
impl BackendAdapter for GraphAdapter {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn execute(&self, query: &str) -> Result<Retried<String>, Exhausted<BackendError>> {
        debug!(cypher = %query, "Executing graph query");

        with_retries(BACKEND, self.max_attempts, |_| async move {
            let result = self.run_statement(query).await?;
            Ok(rows_as_json(&result).to_string())
        })
        .await
    }

    fn schema_description(&self) -> &str {
        &self.schema
    }

    fn entity_names(&self) -> Vec<String> {
        self.entities.clone()
    }
}

// --- Transactional API wire types ---

#[derive(Debug, Serialize)]
struct TxRequest {
    statements: Vec<TxStatement>,
}

#[derive(Debug, Serialize)]
struct TxStatement {
    statement: String,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Default, Deserialize)]
struct TxResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    #[serde(default)]
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Surface server-side Cypher errors; otherwise hand back the first result.
fn first_result(tx: TxResponse) -> Result<TxResult, BackendError> {
    if let Some(err) = tx.errors.first() {
        return Err(BackendError::QueryFailed {
            backend: BACKEND.into(),
            reason: format!("{}: {}", err.code, err.message),
        });
    }
    Ok(tx.results.into_iter().next().unwrap_or_default())
}

/// Convert a transactional result into a JSON array of row objects keyed by
/// column name, matching the relational adapter's output shape.
fn rows_as_json(result: &TxResult) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = result
        .data
        .iter()
        .map(|row| {
            let mut obj = serde_json::Map::new();
            for (i, column) in result.columns.iter().enumerate() {
                obj.insert(
                    column.clone(),
                    row.row.get(i).cloned().unwrap_or(serde_json::Value::Null),
                );
            }
            serde_json::Value::Object(obj)
        })
        .collect();
    serde_json::Value::Array(rows)
}

/// Extract the first column of every row as a string list.
fn string_column(result: &TxResult) -> Vec<String> {
    result
        .data
        .iter()
        .filter_map(|row| row.row.first().and_then(|v| v.as_str().map(String::from)))
        .collect()
}

/// Render the schema description placed into the system instructions,
/// following the format the source system generated.
fn format_schema(properties: &TxResult, relationships: &[String]) -> String {
    let mut node_lines = String::new();
    for row in &properties.data {
        let node_type = row
            .row
            .first()
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .replace([':', '`'], "");
        let prop_name = row.row.get(1).and_then(|v| v.as_str()).unwrap_or("Unknown");
        let prop_types = match row.row.get(2) {
            Some(serde_json::Value::Array(types)) => types
                .iter()
                .filter_map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => "Unknown".into(),
        };
        node_lines.push_str(&format!("- {node_type}: {prop_name} ({prop_types})\n"));
    }

    let rel_lines = if relationships.is_empty() {
        "No relationships found".to_string()
    } else {
        relationships
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Knowledge Graph Schema:\n\n\
         Node Types and Properties:\n{node_lines}\n\
         Available Relationships:\n{rel_lines}\n"
    )
}
