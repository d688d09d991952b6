//! Error types for the Plantline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Plantline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Session initialization ---
    #[error("Initialization error: {0}")]
    Init(#[from] InitError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Errors raised while executing a generated query against a data backend.
///
/// These are retried inside the adapter up to a fixed bound; an exhausted
/// retry budget surfaces the last error to the dispatcher, which converts it
/// into a failed tool result rather than aborting the session.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Query execution failed on {backend}: {reason}")]
    QueryFailed { backend: String, reason: String },

    #[error("Connection to {backend} failed: {reason}")]
    Connection { backend: String, reason: String },

    #[error("Query on {backend} timed out after {timeout_secs}s")]
    Timeout { backend: String, timeout_secs: u64 },

    #[error("Statement rejected by {backend}: {reason}")]
    RejectedStatement { backend: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed {
        tool_name: String,
        reason: String,
        /// Retries the backing adapter performed before giving up
        retries: u32,
    },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool '{tool_name}' references unknown backend entities: {missing}")]
    SchemaDrift { tool_name: String, missing: String },
}

/// Fatal errors during session construction (unreachable backend, bad
/// credentials, schema introspection failure). Never recovered locally.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Relational backend unreachable: {0}")]
    Relational(String),

    #[error("Graph backend unreachable: {0}")]
    Graph(String),

    #[error("Schema introspection failed on {backend}: {reason}")]
    SchemaIntrospection { backend: String, reason: String },

    #[error("Language model service unavailable: {0}")]
    Provider(String),
}
