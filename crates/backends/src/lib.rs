//! Backend adapters for Plantline.
//!
//! An adapter turns one model-generated query into a concrete backend
//! invocation and its result back into text the model can read. Every
//! adapter wraps execution in the shared bounded-retry combinator and
//! attaches a deadline to each attempt; after the retry budget is exhausted
//! the last error surfaces upward, where the dispatcher converts it into a
//! failed tool result.
//!
//! Adapters are constructed once per session. Construction failure
//! (unreachable backend, bad credentials) is fatal to session
//! initialization.

pub mod graph;
pub mod relational;
pub mod retry;

pub use graph::GraphAdapter;
pub use relational::RelationalAdapter;
pub use retry::{with_retries, Exhausted, Retried};

use async_trait::async_trait;
use plantline_core::error::BackendError;

/// Common contract for data backends.
///
/// Kept object-safe so tools hold `Arc<dyn BackendAdapter>` and tests can
/// substitute mocks for the real connections.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Short backend name used in logs and error messages.
    fn name(&self) -> &str;

    /// Execute a single generated query and return the result text plus the
    /// retry count the combinator recorded. Failures carry the retry count
    /// too, so exhausted calls report their attempts accurately.
    async fn execute(&self, query: &str) -> Result<Retried<String>, Exhausted<BackendError>>;

    /// The schema description captured at session initialization.
    fn schema_description(&self) -> &str;

    /// Entity names (tables, node labels) observed at initialization.
    fn entity_names(&self) -> Vec<String>;
}
