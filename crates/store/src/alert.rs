//! Alert feed (C13e). Generated by the pipeline, read/acked by the API and
//! pushed outbound through the notify crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Spike,
    NewCluster,
    SynthReady,
    Growth,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Spike => "spike",
            AlertType::NewCluster => "new_cluster",
            AlertType::SynthReady => "synth_ready",
            AlertType::Growth => "growth",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub id: i64,
    pub alert_type: String,
    pub cluster_id: Option<i64>,
    pub topic_canonical: Option<String>,
    pub message: String,
    pub payload: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

pub struct NewAlert {
    pub alert_type: AlertType,
    pub cluster_id: Option<i64>,
    pub topic_canonical: Option<String>,
    pub message: String,
    pub payload: Option<serde_json::Value>,
}

pub struct AlertStore;

impl AlertStore {
    pub async fn insert(pool: &PgPool, a: &NewAlert) -> Result<i64, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO alerts (alert_type, cluster_id, topic_canonical, message, payload)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(a.alert_type.as_str())
        .bind(a.cluster_id)
        .bind(&a.topic_canonical)
        .bind(&a.message)
        .bind(&a.payload)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    pub async fn unread(pool: &PgPool, limit: i64) -> Result<Vec<Alert>, sqlx::Error> {
        sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE read = false ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<Alert>, sqlx::Error> {
        sqlx::query_as::<_, Alert>("SELECT * FROM alerts ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn mark_read(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE alerts SET read = true WHERE id = $1").bind(id).execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE alerts SET read = true WHERE read = false").execute(pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn count_unread(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE read = false").fetch_one(pool).await?;
        Ok(count)
    }

    pub async fn list(
        pool: &PgPool,
        alert_type: Option<&str>,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Alert>, sqlx::Error> {
        match (alert_type, unread_only) {
            (Some(t), true) => {
                sqlx::query_as::<_, Alert>(
                    "SELECT * FROM alerts WHERE alert_type = $1 AND read = false ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(t)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
            (Some(t), false) => {
                sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE alert_type = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3")
                    .bind(t)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
            }
            (None, true) => {
                sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE read = false ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
            }
            (None, false) => {
                sqlx::query_as::<_, Alert>("SELECT * FROM alerts ORDER BY created_at DESC LIMIT $1 OFFSET $2")
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
            }
        }
    }

    /// True if a spike alert already fired for this topic today, to avoid
    /// re-alerting every cron tick of the same spike.
    pub async fn spike_already_fired(pool: &PgPool, topic_canonical: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM alerts WHERE alert_type = 'spike' AND topic_canonical = $1
               AND created_at::date = now()::date LIMIT 1",
        )
        .bind(topic_canonical)
        .fetch_optional(pool)
        .await?;
        Ok(row.is_some())
    }

    /// True if a growth alert already fired for this cluster today, to avoid
    /// re-alerting every tick a cluster sits above the growth threshold.
    pub async fn growth_already_fired(pool: &PgPool, cluster_id: i64) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM alerts WHERE alert_type = 'growth' AND cluster_id = $1
               AND created_at::date = now()::date LIMIT 1",
        )
        .bind(cluster_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.is_some())
    }

    /// True if an alert of `alert_type` already exists for `cluster_id`, used
    /// for alerts (like synth-ready) that should fire once per cluster rather
    /// than once per day.
    pub async fn alert_exists_for_cluster(pool: &PgPool, alert_type: &str, cluster_id: i64) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM alerts WHERE alert_type = $1 AND cluster_id = $2 LIMIT 1")
            .bind(alert_type)
            .bind(cluster_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }
}
