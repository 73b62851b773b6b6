//! notify-worker — polls unread alerts and dispatches them to configured
//! notification channels (webhook, email, telegram).
//!
//! Runs the same fixed-interval loop shape as `pain-cron`: acquire nothing
//! exclusive (alert dispatch is idempotent via `mark_read`), poll, sleep,
//! repeat.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use painmine_core::config::Config;
use painmine_notify::dispatcher::Dispatcher;
use painmine_notify::templating::{AlertContext, TemplateContext, TemplateRenderer};
use painmine_notify::traits::{Notification, Notifier};
use painmine_notify::{email::EmailNotifier, telegram::TelegramNotifier, webhook::WebhookNotifier};
use painmine_store::alert::AlertStore;
use tracing::{info, warn};

const DEFAULT_RULE_ID: &str = "default";

/// notify-worker — dispatches pain-mining alerts to configured channels.
#[derive(Parser, Debug)]
#[command(name = "notify-worker", version, about)]
struct Cli {
    /// Seconds between poll cycles.
    #[arg(long, env = "NOTIFY_POLL_SECONDS", default_value_t = 60)]
    poll_seconds: u64,

    /// Maximum unread alerts to dispatch per poll cycle.
    #[arg(long, env = "NOTIFY_BATCH_SIZE", default_value_t = 50)]
    batch_size: i64,

    /// Run a single poll cycle and exit instead of looping.
    #[arg(long)]
    once: bool,
}

fn subject_template() -> &'static str {
    "[{{ alert.alert_type | upper }}] {{ alert.topic_canonical }}"
}

fn body_template() -> &'static str {
    "{{ alert.message }}\n\nCluster: {{ alert.cluster_id }}\nAt: {{ now }}"
}

/// Build the channel list from environment variables. Every channel is
/// optional — a notifier is only constructed when its required env vars
/// are present, so an unconfigured deployment dispatches to nothing.
fn build_channels(renderer: Arc<TemplateRenderer>) -> Vec<Box<dyn Notifier>> {
    let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

    if let Ok(url) = std::env::var("NOTIFY_WEBHOOK_URL") {
        match WebhookNotifier::from_config(url, None, None, None, renderer.clone()) {
            Ok(n) => channels.push(Box::new(n)),
            Err(e) => warn!(error = %e, "failed to configure webhook notifier"),
        }
    }

    if let (Ok(host), Ok(from), Ok(to)) = (
        std::env::var("NOTIFY_SMTP_HOST"),
        std::env::var("NOTIFY_SMTP_FROM"),
        std::env::var("NOTIFY_SMTP_TO"),
    ) {
        let port = std::env::var("NOTIFY_SMTP_PORT").ok().and_then(|p| p.parse().ok());
        let recipients: Vec<String> = to.split(',').map(|s| s.trim().to_string()).collect();
        match EmailNotifier::from_config(&host, port, None, &from, &recipients) {
            Ok(n) => channels.push(Box::new(n)),
            Err(e) => warn!(error = %e, "failed to configure email notifier"),
        }
    }

    if let (Ok(token), Ok(chat_id)) = (
        std::env::var("NOTIFY_TELEGRAM_BOT_TOKEN"),
        std::env::var("NOTIFY_TELEGRAM_CHAT_ID"),
    ) {
        match TelegramNotifier::from_config(token, chat_id, Some("MarkdownV2".to_string())) {
            Ok(n) => channels.push(Box::new(n)),
            Err(e) => warn!(error = %e, "failed to configure telegram notifier"),
        }
    }

    channels
}

async fn poll_once(pool: &sqlx::PgPool, dispatcher: &Dispatcher, renderer: &TemplateRenderer, batch_size: i64) -> anyhow::Result<u32> {
    let alerts = AlertStore::unread(pool, batch_size).await?;
    let mut dispatched = 0u32;

    for alert in alerts {
        let ctx = TemplateContext {
            alert: AlertContext {
                id: alert.id,
                alert_type: alert.alert_type.clone(),
                cluster_id: alert.cluster_id,
                topic_canonical: alert.topic_canonical.clone(),
                message: alert.message.clone(),
                payload: alert.payload.clone(),
            },
            now: chrono::Utc::now().to_rfc3339(),
        };

        let subject = renderer.render(subject_template(), &ctx).unwrap_or_else(|_| alert.message.clone());
        let body = renderer.render(body_template(), &ctx).unwrap_or_else(|_| alert.message.clone());

        let notification = Notification {
            subject,
            body,
            metadata: std::collections::HashMap::from([
                ("alert_id".to_string(), alert.id.to_string()),
                ("alert_type".to_string(), alert.alert_type.clone()),
            ]),
        };

        let results = dispatcher.dispatch(DEFAULT_RULE_ID, &notification).await;
        if results.is_empty() || results.iter().any(|r| r.success) {
            AlertStore::mark_read(pool, alert.id).await?;
            dispatched += 1;
        } else {
            warn!(alert_id = alert.id, "all channels failed, leaving alert unread for retry");
        }
    }

    Ok(dispatched)
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
    let renderer = Arc::new(TemplateRenderer::new());
    let channels = build_channels(renderer.clone());
    info!(channel_count = channels.len(), "notify-worker channels configured");
    let dispatcher = Dispatcher::with_defaults(channels);

    loop {
        match poll_once(&pool, &dispatcher, &renderer, cli.batch_size).await {
            Ok(dispatched) => {
                if dispatched > 0 {
                    info!(dispatched, "alerts dispatched");
                }
            }
            Err(e) => warn!(error = %e, "poll cycle failed"),
        }

        if cli.once {
            break;
        }
        tokio::time::sleep(Duration::from_secs(cli.poll_seconds)).await;
    }

    Ok(())
}
