//! C14 Orchestrator — sequences C1–C13 for one cron tick (§4.13).

use std::sync::Arc;

use chrono::Utc;
use painmine_core::config::Config;
use painmine_embed::Embedder;
use painmine_llm::LlmProvider;
use painmine_sources::{HnClient, RedditClient, Sort};
use painmine_store::processing_state::ProcessingStateStore;
use sqlx::PgPool;

/// Subreddits monitored every tick. Not configurable per §6 — fixed the
/// same way the competitor miner's vertical map is fixed.
const SUBREDDITS: &[&str] = &[
    "smallbusiness",
    "Entrepreneur",
    "freelance",
    "SaaS",
    "startups",
    "sweatystartup",
    "sysadmin",
    "ecommerce",
];

const HN_QUERIES: &[&str] = &["wish there was a tool", "frustrated with", "looking for an alternative to"];

#[derive(Debug, Default, serde::Serialize)]
pub struct TickReport {
    pub cron_count: i64,
    pub posts_ingested: u32,
    pub comments_ingested: u32,
    pub competitor_mentions: u32,
    pub filter_processed: u32,
    pub filter_promoted: u32,
    pub filter_defaulted: u32,
    pub tagged: u32,
    pub tag_failed: u32,
    pub geo_tagged: u32,
    pub embedded: u32,
    pub clustered: u32,
    pub clusters_opened: u32,
    pub rule_merges: u32,
    pub llm_merges: u32,
    pub centroid_merges: u32,
    pub synthesized: u32,
    pub scored: u32,
    pub trends_snapshotted: u32,
    pub market_estimates: u32,
    pub features_extracted: u32,
    pub alerts_raised: u32,
    pub ran_merge_phase: bool,
    pub ran_competitor_phase: bool,
}

/// Run one full orchestrator tick. Returns a report of what ran; phase
/// failures are logged and do not abort later phases (§7) except storage
/// errors, which propagate (the caller treats that as the hard abort
/// condition named in §4.13).
pub async fn run_tick(
    pool: &PgPool,
    config: &Config,
    provider: &dyn LlmProvider,
    embedder: Arc<dyn Embedder>,
) -> Result<TickReport, sqlx::Error> {
    let cron_count = ProcessingStateStore::next_cron_count(pool).await?;
    let mut report = TickReport { cron_count, ..Default::default() };

    // Step 2: ingest twice, different sort orders.
    let mut reddit = RedditClient::new(config.reddit.user_agent.clone(), config.reddit.reddit_rate_ms);
    let mut hn = HnClient::new(config.reddit.hn_rate_ms);

    for sort in [Sort::Top, Sort::Hot] {
        for &subreddit in SUBREDDITS {
            match painmine_sources::ingest::ingest_listing(pool, &mut reddit, subreddit, sort, "day").await {
                Ok(new_posts) => {
                    report.posts_ingested += new_posts.len() as u32;
                    for post in &new_posts {
                        match painmine_sources::ingest::ingest_comments(pool, &mut reddit, post, config.reddit.comment_depth_max).await {
                            Ok(n) => report.comments_ingested += n as u32,
                            Err(e) => return Err(e),
                        }
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
    for query in HN_QUERIES {
        report.comments_ingested += painmine_sources::ingest::ingest_hn_search(pool, &mut hn, query, 20).await? as u32;
    }

    // Step 3: competitor miner, every 3rd tick.
    if config.pipeline.cron_modulo_competitor > 0 && cron_count % config.pipeline.cron_modulo_competitor as i64 == 0 {
        report.ran_competitor_phase = true;
        let run = painmine_pipeline::competitor::run(pool, &mut reddit, &mut hn).await?;
        report.competitor_mentions = run.mentions_found;
    }

    // Step 4: binary filter -> tagger -> geo tagger.
    let filter_run = painmine_pipeline::filter::run(pool, provider, config.pipeline.binary_filter_batch as i64).await?;
    report.filter_processed = filter_run.processed;
    report.filter_promoted = filter_run.promoted;
    report.filter_defaulted = filter_run.defaulted;
    if filter_run.defaulted > 0 {
        ProcessingStateStore::incr_i64(
            pool,
            painmine_store::processing_state::KEY_BINARY_FILTER_DEFAULTED,
            filter_run.defaulted as i64,
        )
        .await?;
    }

    let tag_run = painmine_pipeline::tag::run(pool, provider, 100).await?;
    report.tagged = tag_run.tagged;
    report.tag_failed = tag_run.failed;

    report.geo_tagged = painmine_pipeline::geo::run(pool, 200).await?;

    // Step 5: embed, then cluster.
    let embed_run = painmine_pipeline::embed_phase::run(pool, embedder.clone(), config.pipeline.embed_batch as usize).await?;
    report.embedded = embed_run.embedded;

    let embedding_dims = embedder.dimensions();
    let cluster_run = painmine_pipeline::clusterer::run(pool, embedding_dims, 200).await?;
    report.clustered = cluster_run.assigned;
    report.clusters_opened = cluster_run.created;

    // Step 6: topic merger, every 6th tick (the merger's own rule-based
    // sub-pass still runs every tick; only the LLM sub-phase is gated).
    report.ran_merge_phase = config.pipeline.cron_modulo_merge > 0 && cron_count % config.pipeline.cron_modulo_merge as i64 == 0;
    let merge_run = painmine_pipeline::merger::run(pool, Some(provider), embedding_dims, cron_count, config.pipeline.cron_modulo_merge as i64).await?;
    report.rule_merges = merge_run.rule_based_merges;
    report.llm_merges = merge_run.llm_merges;
    report.centroid_merges = merge_run.centroid_merges;

    // Step 7: synthesize -> score -> snapshot trends.
    let synth_run = painmine_pipeline::synth::run(pool, provider, config.pipeline.synth_batch).await?;
    report.synthesized = synth_run.synthesized;

    report.scored = painmine_pipeline::scorer::run(pool).await?;

    let today = Utc::now().date_naive();
    let trend_run = painmine_pipeline::trend::run(pool, today).await?;
    report.trends_snapshotted = trend_run.topics_snapshotted;

    // Step 8: market estimator / feature extractor, offset by parity.
    if config.pipeline.cron_modulo_market > 0 && cron_count % config.pipeline.cron_modulo_market as i64 == 0 {
        report.market_estimates = painmine_pipeline::enrich::run_market_estimator(pool, provider).await?;
    } else {
        report.features_extracted = painmine_pipeline::enrich::run_feature_extractor(pool, provider).await?;
    }
    painmine_pipeline::enrich::run_outreach_builder(pool).await?;

    // Step 9: alert checks.
    report.alerts_raised = painmine_pipeline::enrich::run_alert_checks(pool, today).await?;

    Ok(report)
}
