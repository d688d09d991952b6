//! Session initialization: the once-per-process wiring step.
//!
//! A session owns everything an answer cycle needs — provider handle,
//! connected adapters, tool registry, assembled system instructions, and
//! the thread store. Construction is fail-fast: a missing credential or an
//! unreachable backend aborts initialization with an `InitError` rather
//! than limping into a session that cannot answer.

use plantline_backends::{BackendAdapter, GraphAdapter, RelationalAdapter};
use plantline_config::AppConfig;
use plantline_core::error::{Error, InitError};
use plantline_core::provider::Provider;
use plantline_core::tool::ToolRegistry;
use plantline_core::Result;
use plantline_providers::OpenAiCompatProvider;
use plantline_tools::plant_registry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::context::ContextAssembler;
use crate::controller::AgentController;
use crate::thread_store::ThreadStore;

/// An initialized session. Holds only `Arc`s to immutable state plus the
/// thread store, so it is cheap to share across concurrent answer cycles.
pub struct Session {
    config: AppConfig,
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    store: Arc<ThreadStore>,
    system_context: String,
}

impl Session {
    /// Connect both backends, assemble the context, and build the registry.
    pub async fn initialize(config: AppConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| Error::Config {
            message: "no API key configured (set PLANTLINE_API_KEY or OPENAI_API_KEY)".into(),
        })?;

        let relational_url = config.relational.url.clone().ok_or_else(|| Error::Config {
            message: "no relational backend URL configured (set DATABASE_URL)".into(),
        })?;

        let graph_url = config.graph.url.clone().ok_or_else(|| Error::Config {
            message: "no graph backend URL configured (set NEO4J_URI)".into(),
        })?;

        let provider: Arc<dyn Provider> = Arc::new(
            OpenAiCompatProvider::new("openai", &config.api_url, api_key)
                .map_err(|e| InitError::Provider(e.to_string()))
                .map_err(Error::Init)?,
        );

        let call_timeout = Duration::from_secs(config.agent.call_timeout_secs);

        let relational = RelationalAdapter::connect(
            &relational_url,
            config.relational.max_connections,
            config.agent.max_attempts,
            call_timeout,
        )
        .await
        .map_err(Error::Init)?;

        let graph = GraphAdapter::connect(
            &graph_url,
            &config.graph.database,
            config.graph.username.clone(),
            config.graph.password.clone(),
            config.agent.max_attempts,
            call_timeout,
        )
        .await
        .map_err(Error::Init)?;

        let system_context = ContextAssembler::new(
            config.profile.clone(),
            relational.schema_description(),
            graph.schema_description(),
        )
        .assemble();

        let relational: Arc<dyn BackendAdapter> = Arc::new(relational);
        let graph: Arc<dyn BackendAdapter> = Arc::new(graph);
        let registry = Arc::new(plant_registry(relational, graph));

        info!(model = %config.model, "Session initialized");

        Ok(Self {
            config,
            provider,
            registry,
            store: Arc::new(ThreadStore::new()),
            system_context,
        })
    }

    /// Build a session from already-constructed parts (tests, embedding).
    pub fn from_parts(
        config: AppConfig,
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        system_context: impl Into<String>,
    ) -> Self {
        Self {
            config,
            provider,
            registry,
            store: Arc::new(ThreadStore::new()),
            system_context: system_context.into(),
        }
    }

    /// Build the controller that answers questions against this session.
    pub fn controller(&self) -> AgentController {
        AgentController::new(
            self.provider.clone(),
            self.registry.clone(),
            self.store.clone(),
            &self.system_context,
            &self.config.model,
        )
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens)
        .with_max_turns(self.config.agent.max_turns)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn system_context(&self) -> &str {
        &self.system_context
    }

    pub fn store(&self) -> &Arc<ThreadStore> {
        &self.store
    }
}
