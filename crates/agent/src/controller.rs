//! The agent controller: the turn-taking state machine at the heart of an
//! answer cycle.
//!
//! One cycle runs as a single sequential async task. Each model turn either
//! ends the cycle (tool-free response) or yields tool calls, which are
//! dispatched strictly in request order with each result appended to the
//! thread before the next call executes. A configurable turn cap bounds the
//! cycle; exceeding it produces a deterministic fallback answer instead of
//! an error.

use plantline_core::error::Error;
use plantline_core::message::{Message, MessageToolCall, ThreadId};
use plantline_core::provider::{Provider, ProviderRequest};
use plantline_core::tool::{ToolCall, ToolRegistry};
use plantline_core::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::thread_store::ThreadStore;

/// Answer returned when the turn cap is reached.
pub const FALLBACK_ANSWER: &str =
    "I could not complete this analysis within the allowed number of \
     reasoning steps. Please narrow the question or ask it again.";

/// Where an answer cycle currently stands.
#[derive(Debug)]
pub enum TurnState {
    /// A provider request is due.
    AwaitingModel,
    /// The model requested tool calls; they are dispatched in order.
    DispatchingTools(Vec<MessageToolCall>),
    /// A tool-free response ended the cycle.
    Terminated(String),
}

/// Drives answer cycles against one initialized session.
pub struct AgentController {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    store: Arc<ThreadStore>,
    system_context: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_turns: u32,
}

impl AgentController {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        store: Arc<ThreadStore>,
        system_context: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            store,
            system_context: system_context.into(),
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            max_turns: 10,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the maximum number of model turns per answer cycle.
    pub fn with_max_turns(mut self, max: u32) -> Self {
        self.max_turns = max.max(1);
        self
    }

    /// Answer one question on the given thread.
    ///
    /// Appends the question, runs model turns until the model responds
    /// without tool calls, and returns that response verbatim. Provider
    /// failure is fatal to the cycle and propagates as an error; tool
    /// failures are not — they flow back to the model as failed results.
    pub async fn answer(&self, thread_id: &ThreadId, question: &str) -> Result<String> {
        info!(thread = %thread_id, "Starting answer cycle");

        self.store.get_or_create(thread_id);
        self.store.append(thread_id, Message::user(question));

        let definitions = self.registry.definitions();
        let mut state = TurnState::AwaitingModel;
        let mut turns = 0u32;

        loop {
            match state {
                TurnState::AwaitingModel => {
                    turns += 1;
                    if turns > self.max_turns {
                        warn!(
                            thread = %thread_id,
                            max_turns = self.max_turns,
                            "Turn cap reached, returning fallback answer"
                        );
                        self.store
                            .append(thread_id, Message::assistant(FALLBACK_ANSWER));
                        return Ok(FALLBACK_ANSWER.to_string());
                    }

                    debug!(thread = %thread_id, turn = turns, "Requesting model turn");

                    let mut messages = vec![Message::system(&self.system_context)];
                    messages.extend(self.store.snapshot(thread_id));

                    let request = ProviderRequest {
                        model: self.model.clone(),
                        messages,
                        temperature: self.temperature,
                        max_tokens: self.max_tokens,
                        tools: definitions.clone(),
                    };

                    let response = self
                        .provider
                        .complete(request)
                        .await
                        .map_err(Error::Provider)?;

                    let tool_calls = response.message.tool_calls.clone();
                    let content = response.message.content.clone();
                    self.store.append(thread_id, response.message);

                    state = if tool_calls.is_empty() {
                        TurnState::Terminated(content)
                    } else {
                        TurnState::DispatchingTools(tool_calls)
                    };
                }

                TurnState::DispatchingTools(calls) => {
                    debug!(thread = %thread_id, count = calls.len(), "Dispatching tool calls");

                    // Strictly sequential, in request order; each result is
                    // in the thread before the next call runs.
                    for tc in &calls {
                        let arguments = serde_json::from_str(&tc.arguments)
                            .unwrap_or(serde_json::Value::Null);
                        let call = ToolCall {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            arguments,
                        };

                        let result = self.registry.dispatch(&call).await;
                        debug!(
                            thread = %thread_id,
                            tool = %tc.name,
                            success = result.success,
                            retries = result.retries,
                            "Tool call completed"
                        );
                        self.store
                            .append(thread_id, Message::tool_result(&tc.id, &result.output));
                    }

                    state = TurnState::AwaitingModel;
                }

                TurnState::Terminated(answer) => {
                    info!(thread = %thread_id, turns, "Answer cycle complete");
                    return Ok(answer);
                }
            }
        }
    }
}
