//! End-to-end answer-cycle tests with a scripted provider and mock
//! backend adapters.

use async_trait::async_trait;
use plantline_agent::controller::{AgentController, FALLBACK_ANSWER};
use plantline_agent::thread_store::ThreadStore;
use plantline_backends::{with_retries, BackendAdapter, Exhausted, Retried};
use plantline_core::error::{BackendError, ProviderError};
use plantline_core::message::{Message, MessageToolCall, Role, ThreadId};
use plantline_core::provider::{Provider, ProviderRequest, ProviderResponse};
use plantline_core::tool::{ToolCall, ToolRegistry};
use plantline_tools::{GraphQueryTool, SqlQueryTool};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// A provider that replays a fixed script of assistant messages and records
/// every request it receives.
struct ScriptedProvider {
    script: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let message = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Message::assistant("script exhausted"));
        Ok(ProviderResponse {
            message,
            usage: None,
            model: "scripted-model".into(),
        })
    }
}

fn assistant_with_calls(calls: Vec<(&str, &str, serde_json::Value)>) -> Message {
    let mut msg = Message::assistant("");
    msg.tool_calls = calls
        .into_iter()
        .map(|(id, name, args)| MessageToolCall {
            id: id.into(),
            name: name.into(),
            arguments: args.to_string(),
        })
        .collect();
    msg
}

/// A backend that records queries and can be scripted to fail a number of
/// times before succeeding; failures go through the shared retry combinator
/// exactly as the real adapters do.
struct MockBackend {
    queries: Mutex<Vec<String>>,
    calls: AtomicU32,
    failures_before_success: u32,
    max_attempts: u32,
    result: String,
}

impl MockBackend {
    fn succeeding(result: &str) -> Arc<Self> {
        Arc::new(Self {
            queries: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
            failures_before_success: 0,
            max_attempts: 3,
            result: result.into(),
        })
    }

    fn flaky(failures: u32, result: &str) -> Arc<Self> {
        Arc::new(Self {
            queries: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
            failures_before_success: failures,
            max_attempts: 3,
            result: result.into(),
        })
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendAdapter for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, query: &str) -> Result<Retried<String>, Exhausted<BackendError>> {
        self.queries.lock().unwrap().push(query.to_string());
        with_retries("mock", self.max_attempts, |_| async move {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures_before_success {
                Err(BackendError::QueryFailed {
                    backend: "mock".into(),
                    reason: "transient connection error".into(),
                })
            } else {
                Ok(self.result.clone())
            }
        })
        .await
    }

    fn schema_description(&self) -> &str {
        ""
    }

    fn entity_names(&self) -> Vec<String> {
        Vec::new()
    }
}

fn registry_with(relational: Arc<MockBackend>, graph: Arc<MockBackend>) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SqlQueryTool::new(relational)));
    registry.register(Box::new(GraphQueryTool::new(graph)));
    Arc::new(registry)
}

fn controller(
    provider: Arc<ScriptedProvider>,
    registry: Arc<ToolRegistry>,
    store: Arc<ThreadStore>,
    system_context: &str,
) -> AgentController {
    AgentController::new(provider, registry, store, system_context, "test-model")
}

const DAY_SUM_SQL: &str = "SELECT SUM(quantity) AS total FROM productiondata \
     WHERE timestamp >= '2024-10-18 00:00:00' AND timestamp < '2024-10-19 00:00:00'";

#[tokio::test]
async fn single_day_sum_flows_through_the_relational_tool() {
    let backend = MockBackend::succeeding(r#"[{"total":51230}]"#);
    let graph = MockBackend::succeeding("[]");
    let provider = ScriptedProvider::new(vec![
        assistant_with_calls(vec![(
            "call_1",
            "sql_query",
            serde_json::json!({"query": DAY_SUM_SQL}),
        )]),
        Message::assistant("Total production on 2024-10-18 was 51230 liters."),
    ]);
    let store = Arc::new(ThreadStore::new());
    let ctl = controller(
        provider.clone(),
        registry_with(backend.clone(), graph),
        store.clone(),
        "Today's date is 2024-10-19.",
    );

    let thread = ThreadId::from("scenario-a");
    let answer = ctl.answer(&thread, "How much did we produce yesterday?").await.unwrap();

    assert_eq!(answer, "Total production on 2024-10-18 was 51230 liters.");
    assert_eq!(backend.queries(), vec![DAY_SUM_SQL.to_string()]);

    // The system instructions pin the reference date on every request.
    for request in provider.requests() {
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("2024-10-19"));
    }

    // Thread order: question, tool-call turn, tool result, final answer.
    let messages = store.snapshot(&thread);
    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
    );
    assert!(messages[2].content.contains("51230"));
}

#[tokio::test]
async fn flaky_backend_succeeds_on_third_attempt_with_two_retries() {
    let backend = MockBackend::flaky(2, r#"[{"total":51230}]"#);
    let registry = registry_with(backend.clone(), MockBackend::succeeding("[]"));

    let call = ToolCall {
        id: "call_1".into(),
        name: "sql_query".into(),
        arguments: serde_json::json!({"query": "SELECT 1"}),
    };
    let result = registry.dispatch(&call).await;

    assert!(result.success);
    assert_eq!(result.retries, 2);
    assert_eq!(backend.call_count(), 3);
    assert!(result.output.contains("51230"));
}

#[tokio::test]
async fn exhausted_backend_yields_failed_result_with_real_retry_count() {
    let backend = MockBackend::flaky(u32::MAX, "unused");
    let registry = registry_with(backend.clone(), MockBackend::succeeding("[]"));

    let call = ToolCall {
        id: "call_1".into(),
        name: "sql_query".into(),
        arguments: serde_json::json!({"query": "SELECT 1"}),
    };
    let result = registry.dispatch(&call).await;

    assert!(!result.success);
    assert_eq!(backend.call_count(), 3);
    assert_eq!(result.retries, 2, "three attempts means two retries, even on failure");
    assert!(result.output.contains("transient connection error"));
}

#[tokio::test]
async fn retry_budget_exhaustion_becomes_failed_result_not_abort() {
    let backend = MockBackend::flaky(u32::MAX, "unused");
    let graph = MockBackend::succeeding("[]");
    let provider = ScriptedProvider::new(vec![
        assistant_with_calls(vec![(
            "call_1",
            "sql_query",
            serde_json::json!({"query": "SELECT 1"}),
        )]),
        Message::assistant("I could not retrieve the production data."),
    ]);
    let store = Arc::new(ThreadStore::new());
    let ctl = controller(provider, registry_with(backend.clone(), graph), store.clone(), "ctx");

    let thread = ThreadId::from("exhaustion");
    let answer = ctl.answer(&thread, "How much did we produce?").await.unwrap();

    assert_eq!(answer, "I could not retrieve the production data.");
    assert_eq!(backend.call_count(), 3);
    let messages = store.snapshot(&thread);
    assert!(messages[2].content.contains("transient connection error"));
}

#[tokio::test]
async fn missing_required_argument_never_reaches_the_backend() {
    let backend = MockBackend::succeeding("[]");
    let graph = MockBackend::succeeding("[]");
    let provider = ScriptedProvider::new(vec![
        // The model forgets the required "query" argument.
        assistant_with_calls(vec![("call_1", "sql_query", serde_json::json!({}))]),
        Message::assistant("Let me correct that."),
    ]);
    let store = Arc::new(ThreadStore::new());
    let ctl = controller(provider, registry_with(backend.clone(), graph), store.clone(), "ctx");

    let thread = ThreadId::from("scenario-c");
    ctl.answer(&thread, "Show production").await.unwrap();

    assert_eq!(backend.call_count(), 0, "backend must not be invoked");
    assert_eq!(backend.queries().len(), 0);
    let messages = store.snapshot(&thread);
    assert!(messages[2].content.contains("Validation error"));
}

#[tokio::test]
async fn threads_keep_independent_histories() {
    let registry = registry_with(MockBackend::succeeding("[]"), MockBackend::succeeding("[]"));
    let store = Arc::new(ThreadStore::new());

    let provider_a = ScriptedProvider::new(vec![Message::assistant("Line A answer")]);
    let ctl_a = controller(provider_a, registry.clone(), store.clone(), "ctx");
    let provider_b = ScriptedProvider::new(vec![Message::assistant("Line B answer")]);
    let ctl_b = controller(provider_b, registry, store.clone(), "ctx");

    let a = ThreadId::from("shift-a");
    let b = ThreadId::from("shift-b");
    ctl_a.answer(&a, "Question about line A").await.unwrap();
    ctl_b.answer(&b, "Question about line B").await.unwrap();

    let a_msgs = store.snapshot(&a);
    let b_msgs = store.snapshot(&b);
    assert_eq!(a_msgs.len(), 2);
    assert_eq!(b_msgs.len(), 2);
    assert!(a_msgs.iter().all(|m| !m.content.contains("line B")));
    assert!(b_msgs.iter().all(|m| !m.content.contains("line A")));
}

#[tokio::test]
async fn tool_free_response_terminates_immediately() {
    let registry = registry_with(MockBackend::succeeding("[]"), MockBackend::succeeding("[]"));
    let provider = ScriptedProvider::new(vec![Message::assistant("No data needed for that.")]);
    let store = Arc::new(ThreadStore::new());
    let ctl = controller(provider.clone(), registry, store.clone(), "ctx");

    let thread = ThreadId::from("direct");
    let answer = ctl.answer(&thread, "What is your role?").await.unwrap();

    assert_eq!(answer, "No data needed for that.");
    assert_eq!(provider.requests().len(), 1);
    assert_eq!(store.snapshot(&thread).len(), 2);
}

#[tokio::test]
async fn tool_results_are_appended_in_request_order() {
    let relational = MockBackend::succeeding(r#"[{"total":100}]"#);
    let graph = MockBackend::succeeding(r#"[{"name":"Line A"}]"#);
    let provider = ScriptedProvider::new(vec![
        assistant_with_calls(vec![
            ("call_1", "sql_query", serde_json::json!({"query": "SELECT 1"})),
            ("call_2", "graph_query", serde_json::json!({"query": "MATCH (n) RETURN n"})),
        ]),
        Message::assistant("done"),
    ]);
    let store = Arc::new(ThreadStore::new());
    let ctl = controller(provider, registry_with(relational, graph), store.clone(), "ctx");

    let thread = ThreadId::from("ordering");
    ctl.answer(&thread, "Both backends please").await.unwrap();

    let messages = store.snapshot(&thread);
    // user, assistant turn, two tool results in request order, final answer
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_2"));
    assert!(messages[2].content.contains("100"));
    assert!(messages[3].content.contains("Line A"));
}

#[tokio::test]
async fn turn_cap_yields_deterministic_fallback() {
    let backend = MockBackend::succeeding("[]");
    // Every scripted turn asks for another tool call.
    let script: Vec<Message> = (0..5)
        .map(|i| {
            let id = format!("call_{i}");
            assistant_with_calls(vec![(
                id.as_str(),
                "sql_query",
                serde_json::json!({"query": "SELECT 1"}),
            )])
        })
        .collect();
    let provider = ScriptedProvider::new(script);
    let store = Arc::new(ThreadStore::new());
    let ctl = controller(
        provider.clone(),
        registry_with(backend, MockBackend::succeeding("[]")),
        store.clone(),
        "ctx",
    )
    .with_max_turns(2);

    let thread = ThreadId::from("capped");
    let answer = ctl.answer(&thread, "Loop forever").await.unwrap();

    assert_eq!(answer, FALLBACK_ANSWER);
    assert_eq!(provider.requests().len(), 2);
    let last = store.snapshot(&thread).last().cloned().unwrap();
    assert_eq!(last.content, FALLBACK_ANSWER);
}

#[tokio::test]
async fn malformed_tool_arguments_fail_validation() {
    let backend = MockBackend::succeeding("[]");
    let graph = MockBackend::succeeding("[]");
    let mut bad_call = Message::assistant("");
    bad_call.tool_calls = vec![MessageToolCall {
        id: "call_1".into(),
        name: "sql_query".into(),
        arguments: "not valid json".into(),
    }];
    let provider = ScriptedProvider::new(vec![bad_call, Message::assistant("recovered")]);
    let store = Arc::new(ThreadStore::new());
    let ctl = controller(provider, registry_with(backend.clone(), graph), store.clone(), "ctx");

    let thread = ThreadId::from("malformed");
    let answer = ctl.answer(&thread, "go").await.unwrap();

    assert_eq!(answer, "recovered");
    assert_eq!(backend.call_count(), 0);
    assert!(store.snapshot(&thread)[2].content.contains("Validation error"));
}
