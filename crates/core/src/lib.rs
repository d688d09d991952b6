//! # Plantline Core
//!
//! Domain types, traits, and error definitions for the Plantline
//! plant-operations agent. This crate defines the domain model that all
//! other crates implement against.
//!
//! ## Design Philosophy
//!
//! The seams (language model, tools) are traits here; implementations live
//! in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod schema;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{BackendError, Error, InitError, ProviderError, Result, ToolError};
pub use message::{Message, Role, Thread, ThreadId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
