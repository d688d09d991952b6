//! Relational adapter — executes generated SQL against PostgreSQL.
//!
//! The adapter accepts exactly one read-only statement per call. Statements
//! are screened before they reach the pool: the source system allowed
//! arbitrary model-generated SQL with no grant restriction, and this
//! reimplementation closes that gap at the adapter boundary.
//!
//! Results come back as a JSON array of row objects; the query is wrapped in
//! `json_agg(row_to_json(...))` so PostgreSQL does the serialization and the
//! adapter stays ignorant of column types.

use async_trait::async_trait;
use plantline_core::error::{BackendError, InitError};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info};

use crate::retry::{with_retries, Exhausted, Retried};
use crate::BackendAdapter;

const BACKEND: &str = "postgres";

/// Adapter over one PostgreSQL connection pool, constructed once per session.
pub struct RelationalAdapter {
    pool: PgPool,
    table_info: String,
    tables: Vec<String>,
    max_attempts: u32,
    call_timeout: Duration,
}

impl RelationalAdapter {
    /// Connect to the database and introspect its schema.
    ///
    /// Fatal on failure: a session without a reachable relational backend
    /// cannot answer anything.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        max_attempts: u32,
        call_timeout: Duration,
    ) -> Result<Self, InitError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| InitError::Relational(format!("connection failed: {e}")))?;

        let columns = fetch_columns(&pool).await.map_err(|e| {
            InitError::SchemaIntrospection {
                backend: BACKEND.into(),
                reason: e.to_string(),
            }
        })?;

        let table_info = format_table_info(&columns);
        let tables = table_names(&columns);

        info!(tables = tables.len(), "Relational backend connected");

        Ok(Self {
            pool,
            table_info,
            tables,
            max_attempts,
            call_timeout,
        })
    }

    /// Build an adapter around an existing pool (tests, embedded setups).
    pub fn from_pool(
        pool: PgPool,
        table_info: String,
        tables: Vec<String>,
        max_attempts: u32,
        call_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            table_info,
            tables,
            max_attempts,
            call_timeout,
        }
    }

    async fn run_once(&self, sql: &str) -> Result<String, BackendError> {
        let wrapped = wrap_as_json(sql);
        let fetch = sqlx::query_scalar::<_, serde_json::Value>(&wrapped).fetch_one(&self.pool);

        let value = tokio::time::timeout(self.call_timeout, fetch)
            .await
            .map_err(|_| BackendError::Timeout {
                backend: BACKEND.into(),
                timeout_secs: self.call_timeout.as_secs(),
            })?
            .map_err(|e| BackendError::QueryFailed {
                backend: BACKEND.into(),
                reason: e.to_string(),
            })?;

        Ok(value.to_string())
    }
}

#[async_trait]
impl BackendAdapter for RelationalAdapter {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn execute(&self, query: &str) -> Result<Retried<String>, Exhausted<BackendError>> {
        let statement = ensure_read_only(query).map_err(|error| Exhausted { error, retries: 0 })?;
        debug!(sql = %statement, "Executing relational query");

        let statement = statement.as_str();
        with_retries(BACKEND, self.max_attempts, move |_| {
            self.run_once(statement)
        })
        .await
    }

    fn schema_description(&self) -> &str {
        &self.table_info
    }

    fn entity_names(&self) -> Vec<String> {
        self.tables.clone()
    }
}

/// Keywords that make a statement write data even when it opens with
/// `WITH`; PostgreSQL allows data-modifying CTEs, so the first word alone
/// is not enough.
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "TRUNCATE", "DROP", "ALTER", "CREATE", "GRANT",
    "REVOKE", "INTO",
];

/// Screen a generated statement: exactly one statement, read-only.
///
/// Returns the normalized statement (trailing semicolon stripped) or a
/// `RejectedStatement` error that the model can act on. The whole body is
/// scanned outside string literals, so `WITH x AS (DELETE ...)` is rejected
/// while `WHERE note = 'delete me'` or `name = 'a;b'` passes.
pub fn ensure_read_only(sql: &str) -> Result<String, BackendError> {
    let trimmed = sql.trim().trim_end_matches(';').trim();

    if trimmed.is_empty() {
        return Err(rejected("empty statement"));
    }

    let first_word = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();

    match first_word.as_str() {
        "SELECT" | "WITH" => {}
        other => {
            return Err(rejected(&format!(
                "only read-only SELECT/WITH statements are allowed, got '{other}'"
            )))
        }
    }

    scan_statement_body(trimmed)?;
    Ok(trimmed.to_string())
}

/// Walk the statement character by character, skipping single-quoted string
/// literals (including the `''` escape), rejecting bare semicolons and
/// data-modifying keywords found outside literals.
fn scan_statement_body(sql: &str) -> Result<(), BackendError> {
    let mut in_string = false;
    let mut word = String::new();

    for c in sql.chars() {
        if in_string {
            if c == '\'' {
                in_string = false;
            }
            continue;
        }
        if c == '\'' {
            reject_write_keyword(&mut word)?;
            in_string = true;
            continue;
        }
        if c == ';' {
            return Err(rejected(
                "multiple statements are not allowed; provide exactly one SELECT",
            ));
        }
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
        } else {
            reject_write_keyword(&mut word)?;
        }
    }

    reject_write_keyword(&mut word)
}

fn reject_write_keyword(word: &mut String) -> Result<(), BackendError> {
    if word.is_empty() {
        return Ok(());
    }
    let upper = word.to_ascii_uppercase();
    word.clear();
    if WRITE_KEYWORDS.contains(&upper.as_str()) {
        return Err(rejected(&format!(
            "data-modifying keyword '{upper}' is not allowed in a read-only statement"
        )));
    }
    Ok(())
}

fn rejected(reason: &str) -> BackendError {
    BackendError::RejectedStatement {
        backend: BACKEND.into(),
        reason: reason.into(),
    }
}

/// Wrap a screened statement so PostgreSQL returns one JSON array of rows.
fn wrap_as_json(sql: &str) -> String {
    format!("SELECT COALESCE(json_agg(row_to_json(t)), '[]'::json) FROM ({sql}) AS t")
}

/// One column of the introspected schema: (table, column, data type).
type ColumnRow = (String, String, String);

async fn fetch_columns(pool: &PgPool) -> Result<Vec<ColumnRow>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT table_name, column_name, data_type \
         FROM information_schema.columns \
         WHERE table_schema = 'public' \
         ORDER BY table_name, ordinal_position",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok((
                row.try_get::<String, _>(0)?,
                row.try_get::<String, _>(1)?,
                row.try_get::<String, _>(2)?,
            ))
        })
        .collect()
}

/// Render the table-info block placed into the system instructions.
fn format_table_info(columns: &[ColumnRow]) -> String {
    let mut out = String::new();
    let mut current_table: Option<&str> = None;

    for (table, column, data_type) in columns {
        if current_table != Some(table.as_str()) {
            if current_table.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("Table {table}:\n"));
            current_table = Some(table);
        }
        out.push_str(&format!("  - {column} ({data_type})\n"));
    }

    out
}

fn table_names(columns: &[ColumnRow]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (table, _, _) in columns {
        if names.last().map(String::as_str) != Some(table.as_str()) {
            names.push(table.clone());
        }
    }
    names
}
