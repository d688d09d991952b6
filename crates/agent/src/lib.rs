//! The Plantline agent: session wiring, conversation state, context
//! assembly, and the turn-taking controller.
//!
//! One `Session` is initialized per process — adapters connected, schemas
//! introspected, system instructions assembled — and the `AgentController`
//! answers questions against it, one answer cycle per thread at a time.

pub mod context;
pub mod controller;
pub mod session;
pub mod thread_store;

pub use context::ContextAssembler;
pub use controller::{AgentController, TurnState};
pub use session::Session;
pub use thread_store::ThreadStore;
