//! pain-cron — runs the pain-mining pipeline on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use painmine_core::config::Config;
use painmine_store::processing_state::ProcessingStateStore;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "pain-cron", version, about)]
struct Cli {
    /// Seconds between ticks.
    #[arg(long, env = "CRON_INTERVAL_SECONDS", default_value_t = 900)]
    interval_seconds: u64,

    /// Run a single tick and exit instead of looping.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    painmine_core::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let pool = painmine_store::connect_and_migrate(&config.postgres).await?;
    let provider = painmine_llm::create_provider(&config.llm)?;
    let embedder: Arc<dyn painmine_embed::Embedder> = Arc::from(painmine_embed::create_embedder(&config.llm)?);

    loop {
        if !ProcessingStateStore::try_acquire_tick_lock(&pool).await? {
            warn!("previous tick still marked in-progress, skipping this interval");
        } else {
            let started = std::time::Instant::now();
            let result = painmine_orchestrator::tick::run_tick(&pool, &config, provider.as_ref(), embedder.clone()).await;
            ProcessingStateStore::release_tick_lock(&pool).await?;

            match result {
                Ok(report) => info!(elapsed_ms = started.elapsed().as_millis() as u64, ?report, "tick complete"),
                Err(e) => error!(error = %e, "tick aborted on storage error"),
            }
        }

        if cli.once {
            break;
        }
        tokio::time::sleep(Duration::from_secs(cli.interval_seconds)).await;
    }

    Ok(())
}
