mod api;
mod error;
mod identity;
mod router;
mod state;

use std::sync::Arc;

use painmine_core::config::Config;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    painmine_core::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    config.log_summary();

    let pool = painmine_store::connect_and_migrate(&config.postgres).await?;
    let provider = painmine_llm::create_provider(&config.llm)?;
    let embedder: Arc<dyn painmine_embed::Embedder> = Arc::from(painmine_embed::create_embedder(&config.llm)?);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState { pool, config, provider, embedder });
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "pain-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
