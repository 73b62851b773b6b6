//! Trend tracking (C10). `pain_trends` is an append-only daily snapshot
//! keyed by (topic, date, bucket); `trend_summary` is the upsert-in-place
//! rollup the read API serves from (I5: one summary row per topic).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PainTrend {
    pub topic_canonical: String,
    pub snapshot_date: NaiveDate,
    pub bucket_type: String,
    pub cluster_id: Option<i64>,
    pub mention_count: i32,
    pub new_mentions: i32,
    pub velocity: Option<f64>,
    pub velocity_7d: Option<f64>,
    pub velocity_30d: Option<f64>,
    pub trend_status: String,
    pub is_spike: bool,
    pub avg_severity: Option<f64>,
    pub subreddit_spread: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrendSummary {
    pub topic_canonical: String,
    pub current_count: i32,
    pub current_velocity: Option<f64>,
    pub trend_status: String,
    pub peak_count: i32,
    pub peak_date: Option<NaiveDate>,
    pub first_seen: NaiveDate,
    pub last_updated: DateTime<Utc>,
    pub sparkline: Option<serde_json::Value>,
}

pub struct NewSnapshot {
    pub topic_canonical: String,
    pub snapshot_date: NaiveDate,
    pub cluster_id: Option<i64>,
    pub mention_count: i32,
    pub new_mentions: i32,
    pub velocity: Option<f64>,
    pub velocity_7d: Option<f64>,
    pub velocity_30d: Option<f64>,
    pub trend_status: String,
    pub is_spike: bool,
    pub avg_severity: Option<f64>,
    pub subreddit_spread: i32,
}

pub struct TrendStore;

impl TrendStore {
    /// Upsert-by-unique-key (I5): re-running the snapshotter for the same
    /// day overwrites rather than duplicating.
    pub async fn upsert_snapshot(pool: &PgPool, s: &NewSnapshot) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO pain_trends
                (topic_canonical, snapshot_date, cluster_id, mention_count, new_mentions,
                 velocity, velocity_7d, velocity_30d, trend_status, is_spike, avg_severity, subreddit_spread)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (topic_canonical, snapshot_date, bucket_type) DO UPDATE SET
                cluster_id = EXCLUDED.cluster_id,
                mention_count = EXCLUDED.mention_count,
                new_mentions = EXCLUDED.new_mentions,
                velocity = EXCLUDED.velocity,
                velocity_7d = EXCLUDED.velocity_7d,
                velocity_30d = EXCLUDED.velocity_30d,
                trend_status = EXCLUDED.trend_status,
                is_spike = EXCLUDED.is_spike,
                avg_severity = EXCLUDED.avg_severity,
                subreddit_spread = EXCLUDED.subreddit_spread",
        )
        .bind(&s.topic_canonical)
        .bind(s.snapshot_date)
        .bind(s.cluster_id)
        .bind(s.mention_count)
        .bind(s.new_mentions)
        .bind(s.velocity)
        .bind(s.velocity_7d)
        .bind(s.velocity_30d)
        .bind(&s.trend_status)
        .bind(s.is_spike)
        .bind(s.avg_severity)
        .bind(s.subreddit_spread)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mention counts for the `days` days strictly before `date`, oldest
    /// first, used to compute 7d/30d averages and the sparkline. Excludes
    /// `date` itself so re-running the snapshotter for the same day (I5) does
    /// not fold today's own just-committed row into its own history.
    pub async fn history(
        pool: &PgPool,
        topic_canonical: &str,
        date: NaiveDate,
        days: i64,
    ) -> Result<Vec<(NaiveDate, i32)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT snapshot_date, mention_count FROM pain_trends
             WHERE topic_canonical = $1 AND bucket_type = 'daily'
               AND snapshot_date > $2 - ($3 || ' days')::interval AND snapshot_date < $2
             ORDER BY snapshot_date ASC",
        )
        .bind(topic_canonical)
        .bind(date)
        .bind(days.to_string())
        .fetch_all(pool)
        .await
    }

    pub async fn summary(pool: &PgPool, topic_canonical: &str) -> Result<Option<TrendSummary>, sqlx::Error> {
        sqlx::query_as::<_, TrendSummary>("SELECT * FROM trend_summary WHERE topic_canonical = $1")
            .bind(topic_canonical)
            .fetch_optional(pool)
            .await
    }

    pub async fn upsert_summary(
        pool: &PgPool,
        topic_canonical: &str,
        current_count: i32,
        current_velocity: Option<f64>,
        trend_status: &str,
        snapshot_date: NaiveDate,
        sparkline: &[i32],
    ) -> Result<(), sqlx::Error> {
        let sparkline_json = serde_json::to_value(sparkline).unwrap_or(serde_json::json!([]));
        sqlx::query(
            "INSERT INTO trend_summary
                (topic_canonical, current_count, current_velocity, trend_status, peak_count, peak_date, first_seen, sparkline)
             VALUES ($1, $2, $3, $4, $2, $5, $5, $6)
             ON CONFLICT (topic_canonical) DO UPDATE SET
                current_count = EXCLUDED.current_count,
                current_velocity = EXCLUDED.current_velocity,
                trend_status = EXCLUDED.trend_status,
                peak_count = GREATEST(trend_summary.peak_count, EXCLUDED.current_count),
                peak_date = CASE WHEN EXCLUDED.current_count > trend_summary.peak_count
                                  THEN EXCLUDED.peak_date ELSE trend_summary.peak_date END,
                last_updated = now(),
                sparkline = EXCLUDED.sparkline",
        )
        .bind(topic_canonical)
        .bind(current_count)
        .bind(current_velocity)
        .bind(trend_status)
        .bind(snapshot_date)
        .bind(sparkline_json)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn spiking(pool: &PgPool, date: NaiveDate, limit: i64) -> Result<Vec<PainTrend>, sqlx::Error> {
        sqlx::query_as::<_, PainTrend>(
            "SELECT * FROM pain_trends WHERE snapshot_date = $1 AND is_spike = true ORDER BY mention_count DESC LIMIT $2",
        )
        .bind(date)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn all_topics(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT normalized_topic FROM pain_records WHERE normalized_topic IS NOT NULL")
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    pub async fn list_summaries(pool: &PgPool, limit: i64) -> Result<Vec<TrendSummary>, sqlx::Error> {
        sqlx::query_as::<_, TrendSummary>("SELECT * FROM trend_summary ORDER BY current_count DESC LIMIT $1")
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn list_summaries_paged(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<TrendSummary>, sqlx::Error> {
        sqlx::query_as::<_, TrendSummary>(
            "SELECT * FROM trend_summary ORDER BY current_count DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Summaries whose current status matches one of `statuses` (e.g.
    /// `["cooling", "cold"]` for the `/trends/cooling` view).
    pub async fn by_statuses(pool: &PgPool, statuses: &[&str], limit: i64) -> Result<Vec<TrendSummary>, sqlx::Error> {
        sqlx::query_as::<_, TrendSummary>(
            "SELECT * FROM trend_summary WHERE trend_status = ANY($1) ORDER BY current_count DESC LIMIT $2",
        )
        .bind(statuses)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
