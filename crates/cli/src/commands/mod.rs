//! CLI command implementations.

pub mod ask;
pub mod chat;
pub mod doctor;

use plantline_agent::Session;
use plantline_config::AppConfig;
use tokio::sync::OnceCell;

static SESSION: OnceCell<Session> = OnceCell::const_new();

/// The process-wide session, initialized on first use.
///
/// Initialization is fail-fast: if a backend is unreachable the error
/// propagates and no half-initialized session is cached; the next call
/// retries from scratch.
pub async fn session() -> Result<&'static Session, Box<dyn std::error::Error>> {
    SESSION
        .get_or_try_init(|| async {
            let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
            Session::initialize(config)
                .await
                .map_err(|e| format!("Failed to initialize session: {e}").into())
        })
        .await
}
