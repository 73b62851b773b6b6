use std::sync::Arc;

use painmine_core::config::Config;
use painmine_embed::Embedder;
use painmine_llm::LlmProvider;
use sqlx::PgPool;

/// Shared state for every handler. `provider`/`embedder` are built once at
/// startup from `config.llm` the same way `pain-cron` builds them for a
/// tick — the read API and the orchestrator binary share no process, only
/// the same construction recipe.
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub provider: Box<dyn LlmProvider>,
    pub embedder: Arc<dyn Embedder>,
}

pub type SharedState = Arc<AppState>;
