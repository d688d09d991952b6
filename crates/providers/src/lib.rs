//! Language-model provider implementations for Plantline.
//!
//! The agent controller only sees the `Provider` trait from
//! `plantline-core`; this crate supplies the concrete OpenAI-compatible
//! client used in deployments.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
