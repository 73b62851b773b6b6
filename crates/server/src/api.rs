//! Read API handlers (C15, §6). Mostly thin wrappers over the store crate;
//! `/api/opportunities` and the trigger endpoints are the only places with
//! real handler-side logic.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use painmine_embed::Embedder;
use painmine_store::alert::AlertStore;
use painmine_store::cluster::ClusterStore;
use painmine_store::competitor::CompetitorStore;
use painmine_store::feature::FeatureStore;
use painmine_store::geo::GeoStore;
use painmine_store::landing::LandingStore;
use painmine_store::market::MarketStore;
use painmine_store::outreach::OutreachStore;
use painmine_store::pain::PainStore;
use painmine_store::processing_state::ProcessingStateStore;
use painmine_store::trend::TrendStore;

use crate::error::ApiError;
use crate::state::AppState;

fn default_limit() -> i64 {
    20
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, 500)
}

// ── /health ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: i64,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().timestamp_millis(),
    })
}

// ── /api/opportunities ───────────────────────────────────────

#[derive(Deserialize)]
pub struct OpportunitiesParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    min: Option<i32>,
    #[serde(default)]
    all: bool,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

#[derive(Serialize)]
pub struct OpportunityListItem {
    #[serde(flatten)]
    cluster: painmine_store::cluster::PainCluster,
    market: Option<painmine_store::market::MarketEstimate>,
}

/// §4.14: sorting defaults to `social_proof_count DESC`; `min_mentions`
/// defaults to 5 unless `all=true`. `region` filters to clusters that have
/// at least one member tagged with that geo region.
pub async fn opportunities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OpportunitiesParams>,
) -> Result<Json<Vec<OpportunityListItem>>, ApiError> {
    let min_mentions = if params.all { 0 } else { params.min.unwrap_or(5) };
    let sort_by = params.sort.as_deref().unwrap_or("social_proof_count");
    let limit = clamp_limit(params.limit);

    let mut clusters = ClusterStore::list_sorted(&state.pool, min_mentions, sort_by, limit.max(500)).await?;

    if let Some(region) = &params.region {
        let ids: std::collections::HashSet<i64> =
            sqlx::query_as::<_, (i64,)>("SELECT DISTINCT cluster_id FROM pain_records WHERE geo_region = $1 AND cluster_id IS NOT NULL")
                .bind(region)
                .fetch_all(&state.pool)
                .await?
                .into_iter()
                .map(|(id,)| id)
                .collect();
        clusters.retain(|c| ids.contains(&c.id));
    }
    clusters.truncate(limit as usize);

    let mut out = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let market = MarketStore::by_cluster(&state.pool, cluster.id).await?;
        out.push(OpportunityListItem { cluster, market });
    }

    if sort_by == "market_tam" {
        out.sort_by(|a, b| {
            let ta = a.market.as_ref().and_then(|m| m.tam_high).unwrap_or(0);
            let tb = b.market.as_ref().and_then(|m| m.tam_high).unwrap_or(0);
            tb.cmp(&ta)
        });
    }

    Ok(Json(out))
}

#[derive(Serialize)]
pub struct OpportunityDetail {
    #[serde(flatten)]
    cluster: painmine_store::cluster::PainCluster,
    members: Vec<painmine_store::pain::PainRecord>,
    market: Option<painmine_store::market::MarketEstimate>,
}

pub async fn opportunity_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<OpportunityDetail>, ApiError> {
    let cluster = ClusterStore::by_id(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no opportunity with id {id}")))?;
    let members = PainStore::by_cluster(&state.pool, id, 50).await?;
    let market = MarketStore::by_cluster(&state.pool, id).await?;
    Ok(Json(OpportunityDetail { cluster, members, market }))
}

pub async fn opportunity_features(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<painmine_store::feature::MvpFeature>>, ApiError> {
    Ok(Json(FeatureStore::by_cluster(&state.pool, id).await?))
}

pub async fn opportunity_landing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<painmine_store::landing::LandingPage>, ApiError> {
    let page = LandingStore::by_cluster(&state.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no landing page for opportunity {id}")))?;
    Ok(Json(page))
}

pub async fn opportunity_outreach(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<painmine_store::outreach::OutreachContact>>, ApiError> {
    Ok(Json(OutreachStore::by_cluster(&state.pool, id).await?))
}

#[derive(Serialize)]
pub struct ClusterGeoBreakdown {
    region: String,
    count: i64,
}

pub async fn opportunity_geo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ClusterGeoBreakdown>>, ApiError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT geo_region, COUNT(*) FROM pain_records
         WHERE cluster_id = $1 AND geo_region IS NOT NULL
         GROUP BY geo_region ORDER BY COUNT(*) DESC",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows.into_iter().map(|(region, count)| ClusterGeoBreakdown { region, count }).collect()))
}

// ── /api/painpoints, /api/topics ──────────────────────────────

#[derive(Deserialize)]
pub struct LimitParams {
    #[serde(default = "default_limit")]
    limit: i64,
}

pub async fn painpoints(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<painmine_store::pain::PainRecord>>, ApiError> {
    Ok(Json(PainStore::recent(&state.pool, clamp_limit(params.limit)).await?))
}

#[derive(Deserialize)]
pub struct PagedParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    page: i64,
}

pub async fn topics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PagedParams>,
) -> Result<Json<Vec<painmine_store::trend::TrendSummary>>, ApiError> {
    let limit = clamp_limit(params.limit);
    let offset = params.page.max(0) * limit;
    Ok(Json(TrendStore::list_summaries_paged(&state.pool, limit, offset).await?))
}

// ── /api/stats ────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatsResponse {
    pain_record_count: i64,
    cluster_count: i64,
    opportunity_count: i64,
    unread_alert_count: i64,
    cron_count: i64,
    binary_filter_defaulted: i64,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let (pain_record_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pain_records").fetch_one(&state.pool).await?;
    let (cluster_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pain_clusters").fetch_one(&state.pool).await?;
    let (opportunity_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM pain_clusters WHERE member_count >= 5").fetch_one(&state.pool).await?;
    let unread_alert_count = AlertStore::count_unread(&state.pool).await?;
    let cron_count = ProcessingStateStore::get_i64(&state.pool, painmine_store::processing_state::KEY_CRON_COUNT, 0).await?;
    let binary_filter_defaulted =
        ProcessingStateStore::get_i64(&state.pool, painmine_store::processing_state::KEY_BINARY_FILTER_DEFAULTED, 0).await?;

    Ok(Json(StatsResponse {
        pain_record_count,
        cluster_count,
        opportunity_count,
        unread_alert_count,
        cron_count,
        binary_filter_defaulted,
    }))
}

// ── /api/trends ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TrendsParams {
    #[serde(default)]
    status: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    #[allow(dead_code)]
    period: Option<String>,
}

pub async fn trends(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendsParams>,
) -> Result<Json<Vec<painmine_store::trend::TrendSummary>>, ApiError> {
    let limit = clamp_limit(params.limit);
    match params.status.as_deref() {
        Some(status) => Ok(Json(TrendStore::by_statuses(&state.pool, &[status], limit).await?)),
        None => Ok(Json(TrendStore::list_summaries(&state.pool, limit).await?)),
    }
}

pub async fn trends_hot(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<painmine_store::trend::TrendSummary>>, ApiError> {
    Ok(Json(TrendStore::by_statuses(&state.pool, &["hot"], clamp_limit(params.limit)).await?))
}

pub async fn trends_cooling(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<painmine_store::trend::TrendSummary>>, ApiError> {
    Ok(Json(TrendStore::by_statuses(&state.pool, &["cooling", "cold"], clamp_limit(params.limit)).await?))
}

#[derive(Deserialize)]
pub struct HistoryParams {
    #[serde(default = "default_days")]
    days: i64,
}

fn default_days() -> i64 {
    30
}

#[derive(Serialize)]
pub struct HistoryPoint {
    date: chrono::NaiveDate,
    mention_count: i32,
}

pub async fn trend_history(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistoryPoint>>, ApiError> {
    let rows = TrendStore::history(&state.pool, &topic, Utc::now().date_naive(), params.days.clamp(1, 365)).await?;
    Ok(Json(rows.into_iter().map(|(date, mention_count)| HistoryPoint { date, mention_count }).collect()))
}

// ── /api/competitors ──────────────────────────────────────────

pub async fn competitors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<painmine_store::competitor::CompetitorMention>>, ApiError> {
    Ok(Json(CompetitorStore::recent(&state.pool, clamp_limit(params.limit)).await?))
}

pub async fn competitors_by_product(
    State(state): State<Arc<AppState>>,
    Path(product): Path<String>,
) -> Result<Json<Vec<painmine_store::competitor::CompetitorMention>>, ApiError> {
    Ok(Json(CompetitorStore::by_product(&state.pool, &product, 100).await?))
}

pub async fn feature_gaps(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<painmine_store::competitor::CompetitorMention>>, ApiError> {
    Ok(Json(CompetitorStore::with_feature_gap(&state.pool, clamp_limit(params.limit)).await?))
}

// ── /api/market ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct MarketParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    #[allow(dead_code)]
    sort: Option<String>,
}

pub async fn market_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MarketParams>,
) -> Result<Json<Vec<painmine_store::market::MarketEstimate>>, ApiError> {
    Ok(Json(MarketStore::top_by_tam(&state.pool, clamp_limit(params.limit)).await?))
}

/// `{id}` is the cluster id — market estimates are one-per-cluster (C13a),
/// so a market detail is addressed the same way an opportunity is.
pub async fn market_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<painmine_store::market::MarketEstimate>, ApiError> {
    MarketStore::by_cluster(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no market estimate for cluster {id}")))
}

// ── /api/features ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct FeaturesParams {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default, rename = "type")]
    priority: Option<String>,
}

pub async fn features(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeaturesParams>,
) -> Result<Json<Vec<painmine_store::feature::MvpFeature>>, ApiError> {
    let limit = clamp_limit(params.limit);
    let all = FeatureStore::recent(&state.pool, limit.max(500)).await?;
    let filtered = match params.priority {
        Some(p) => all.into_iter().filter(|f| f.priority == p).take(limit as usize).collect(),
        None => all.into_iter().take(limit as usize).collect(),
    };
    Ok(Json(filtered))
}

// ── /api/alerts ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AlertsParams {
    #[serde(rename = "type", default)]
    alert_type: Option<String>,
    #[serde(default)]
    unread: bool,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

pub async fn alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertsParams>,
) -> Result<Json<Vec<painmine_store::alert::Alert>>, ApiError> {
    Ok(Json(
        AlertStore::list(
            &state.pool,
            params.alert_type.as_deref(),
            params.unread,
            clamp_limit(params.limit),
            params.offset.max(0),
        )
        .await?,
    ))
}

#[derive(Serialize)]
pub struct AlertCountResponse {
    unread: i64,
}

pub async fn alerts_count(State(state): State<Arc<AppState>>) -> Result<Json<AlertCountResponse>, ApiError> {
    Ok(Json(AlertCountResponse { unread: AlertStore::count_unread(&state.pool).await? }))
}

#[derive(Serialize)]
pub struct SuccessResponse {
    success: bool,
}

pub async fn alert_mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let found = AlertStore::mark_read(&state.pool, id).await?;
    if !found {
        return Err(ApiError::NotFound(format!("no alert with id {id}")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    success: bool,
    marked: u64,
}

pub async fn alerts_mark_all_read(State(state): State<Arc<AppState>>) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let marked = AlertStore::mark_all_read(&state.pool).await?;
    Ok(Json(MarkAllReadResponse { success: true, marked }))
}

// ── /api/geo ──────────────────────────────────────────────────

pub async fn geo_stats(State(state): State<Arc<AppState>>) -> Result<Json<Vec<painmine_store::geo::GeoStats>>, ApiError> {
    Ok(Json(GeoStore::all(&state.pool).await?))
}

pub async fn geo_region(
    State(state): State<Arc<AppState>>,
    Path(region): Path<String>,
) -> Result<Json<painmine_store::geo::GeoStats>, ApiError> {
    GeoStore::by_region(&state.pool, &region)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no geo stats for region {region}")))
}

// ── /api/outreach ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OutreachExportParams {
    opportunity_id: i64,
}

pub async fn outreach_export(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OutreachExportParams>,
) -> Result<Json<Vec<painmine_store::outreach::OutreachContact>>, ApiError> {
    Ok(Json(OutreachStore::by_cluster(&state.pool, params.opportunity_id).await?))
}

#[derive(Deserialize)]
pub struct OutreachStatusBody {
    status: String,
    #[serde(default)]
    notes: Option<String>,
}

pub async fn outreach_update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<OutreachStatusBody>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let found = OutreachStore::update_status(&state.pool, id, &body.status, body.notes.as_deref()).await?;
    if !found {
        return Err(ApiError::NotFound(format!("no outreach contact with id {id}")));
    }
    Ok(Json(SuccessResponse { success: true }))
}

// ── /api/trigger ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct TriggerResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<serde_json::Value>,
}

impl TriggerResponse {
    fn ok(detail: serde_json::Value) -> Json<Self> {
        Json(Self { success: true, error: None, detail: Some(detail) })
    }

    fn err(message: impl Into<String>) -> (axum::http::StatusCode, Json<Self>) {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self { success: false, error: Some(message.into()), detail: None }),
        )
    }
}

/// Manual phase kicks (§6). Each variant runs exactly one pipeline phase
/// against live state; `full` runs a whole orchestrator tick. A storage
/// error is the only failure mode surfaced as `{success:false}` — matching
/// §7's "trigger endpoints return `{success:false, error}` with 500".
pub async fn trigger(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
) -> Result<Json<TriggerResponse>, (axum::http::StatusCode, Json<TriggerResponse>)> {
    let pool = &state.pool;
    let result: Result<serde_json::Value, sqlx::Error> = match action.as_str() {
        "ingest" => run_ingest(&state).await,
        "mine-competitors" => run_competitors(&state).await,
        "extract" => match painmine_pipeline::filter::run(pool, state.provider.as_ref(), state.config.pipeline.binary_filter_batch as i64).await {
            Ok(r) => {
                if r.defaulted > 0 {
                    if let Err(e) =
                        ProcessingStateStore::incr_i64(pool, painmine_store::processing_state::KEY_BINARY_FILTER_DEFAULTED, r.defaulted as i64)
                            .await
                    {
                        return Err(TriggerResponse::err(e.to_string()));
                    }
                }
                Ok(serde_json::json!(r))
            }
            Err(e) => Err(e),
        },
        "tag" => painmine_pipeline::tag::run(pool, state.provider.as_ref(), state.config.pipeline.binary_filter_batch as i64)
            .await
            .map(|r| serde_json::json!(r)),
        "geo-analyze" => painmine_pipeline::geo::run(pool, state.config.pipeline.binary_filter_batch as i64)
            .await
            .map(|n| serde_json::json!({ "geo_tagged": n })),
        "cluster" => {
            match painmine_pipeline::embed_phase::run(pool, state.embedder.clone(), state.config.pipeline.embed_batch as usize)
                .await
            {
                Ok(_) => painmine_pipeline::clusterer::run(pool, state.embedder.dimensions(), state.config.pipeline.embed_batch as i64)
                    .await
                    .map(|r| serde_json::json!(r)),
                Err(e) => Err(e),
            }
        }
        "merge" => {
            let cron_count = match ProcessingStateStore::get_i64(pool, painmine_store::processing_state::KEY_CRON_COUNT, 0).await {
                Ok(v) => v,
                Err(e) => return Err(TriggerResponse::err(e.to_string())),
            };
            painmine_pipeline::merger::run(
                pool,
                Some(state.provider.as_ref()),
                state.embedder.dimensions(),
                cron_count,
                state.config.pipeline.cron_modulo_merge as i64,
            )
            .await
            .map(|r| serde_json::json!(r))
        }
        "synthesize" => painmine_pipeline::synth::run(pool, state.provider.as_ref(), state.config.pipeline.synth_batch)
            .await
            .map(|r| serde_json::json!(r)),
        "score" => painmine_pipeline::scorer::run(pool).await.map(|n| serde_json::json!({ "scored": n })),
        "snapshot-trends" => {
            painmine_pipeline::trend::run(pool, Utc::now().date_naive()).await.map(|r| serde_json::json!(r))
        }
        "estimate-markets" => painmine_pipeline::enrich::run_market_estimator(pool, state.provider.as_ref())
            .await
            .map(|n| serde_json::json!({ "estimated": n })),
        "extract-features" => painmine_pipeline::enrich::run_feature_extractor(pool, state.provider.as_ref())
            .await
            .map(|n| serde_json::json!({ "extracted": n })),
        "build-outreach" => {
            painmine_pipeline::enrich::run_outreach_builder(pool).await.map(|n| serde_json::json!({ "seeded": n }))
        }
        "check-alerts" => painmine_pipeline::enrich::run_alert_checks(pool, Utc::now().date_naive())
            .await
            .map(|n| serde_json::json!({ "alerts_raised": n })),
        "full" => painmine_orchestrator::tick::run_tick(pool, &state.config, state.provider.as_ref(), state.embedder.clone())
            .await
            .map(|r| serde_json::json!(r)),
        "reset" => reset_processing_state(&state).await,
        other => {
            return Err(TriggerResponse::err(format!("unknown trigger action '{other}'")));
        }
    };

    result.map(TriggerResponse::ok).map_err(|e| TriggerResponse::err(e.to_string()))
}

async fn run_ingest(state: &AppState) -> Result<serde_json::Value, sqlx::Error> {
    let mut reddit =
        painmine_sources::RedditClient::new(state.config.reddit.user_agent.clone(), state.config.reddit.reddit_rate_ms);
    let mut total_posts = 0u32;
    let mut total_comments = 0u32;
    for &subreddit in ["smallbusiness", "Entrepreneur", "SaaS"].iter() {
        let posts =
            painmine_sources::ingest::ingest_listing(&state.pool, &mut reddit, subreddit, painmine_sources::Sort::Hot, "day")
                .await?;
        total_posts += posts.len() as u32;
        for post in &posts {
            total_comments +=
                painmine_sources::ingest::ingest_comments(&state.pool, &mut reddit, post, state.config.reddit.comment_depth_max)
                    .await? as u32;
        }
    }
    Ok(serde_json::json!({ "posts_ingested": total_posts, "comments_ingested": total_comments }))
}

async fn run_competitors(state: &AppState) -> Result<serde_json::Value, sqlx::Error> {
    let mut reddit =
        painmine_sources::RedditClient::new(state.config.reddit.user_agent.clone(), state.config.reddit.reddit_rate_ms);
    let mut hn = painmine_sources::HnClient::new(state.config.reddit.hn_rate_ms);
    let report = painmine_pipeline::competitor::run(&state.pool, &mut reddit, &mut hn).await?;
    Ok(serde_json::json!(report))
}

/// Resets the cron counter and rotating indices only — never touches mined
/// data, matching the "reset" action's scope as a dry-run-friendly rewind
/// of scheduling state.
async fn reset_processing_state(state: &AppState) -> Result<serde_json::Value, sqlx::Error> {
    ProcessingStateStore::set(&state.pool, painmine_store::processing_state::KEY_CRON_COUNT, "0").await?;
    ProcessingStateStore::set(&state.pool, painmine_store::processing_state::KEY_COMPETITOR_VERTICAL_INDEX, "0").await?;
    ProcessingStateStore::set(&state.pool, painmine_store::processing_state::KEY_CRON_IN_PROGRESS, "false").await?;
    ProcessingStateStore::set(&state.pool, painmine_store::processing_state::KEY_BINARY_FILTER_DEFAULTED, "0").await?;
    Ok(serde_json::json!({ "reset": true }))
}
