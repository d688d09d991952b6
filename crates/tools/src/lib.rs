//! Concrete data-retrieval tools for Plantline.
//!
//! Two tools cover the plant's data estate: `sql_query` against the
//! relational backend and `graph_query` against the knowledge graph. Each
//! wraps an adapter handle; the model picks between them based on the
//! descriptions and the schema material in the system instructions.

pub mod graph_query;
pub mod sql_query;

pub use graph_query::GraphQueryTool;
pub use sql_query::SqlQueryTool;

use plantline_backends::BackendAdapter;
use plantline_core::tool::ToolRegistry;
use std::sync::Arc;

/// Build the registry for one plant session.
///
/// Registers both query tools and seeds the registry with the entity names
/// the adapters observed at initialization, so drifted tool declarations
/// fail validation instead of reaching a backend.
pub fn plant_registry(
    relational: Arc<dyn BackendAdapter>,
    graph: Arc<dyn BackendAdapter>,
) -> ToolRegistry {
    let mut entities = relational.entity_names();
    entities.extend(graph.entity_names());

    let mut registry = ToolRegistry::new().with_known_entities(entities);
    registry.register(Box::new(SqlQueryTool::new(relational)));
    registry.register(Box::new(GraphQueryTool::new(graph)));
    registry
}
