//! Regional rollups (C11). One row per region, recomputed from
//! `pain_records.geo_region` after each tagging pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeoStats {
    pub region: String,
    pub mention_count: i32,
    pub cluster_count: i32,
    pub top_topics: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

pub struct GeoStore;

impl GeoStore {
    /// Recompute the full geo_stats table from `pain_records` in one pass.
    /// Idempotent: safe to call on every orchestrator tick.
    pub async fn recompute_all(pool: &PgPool) -> Result<(), sqlx::Error> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT geo_region, COUNT(*) FROM pain_records WHERE geo_region IS NOT NULL GROUP BY geo_region",
        )
        .fetch_all(pool)
        .await?;

        let mut tx = pool.begin().await?;
        for (region, mention_count) in rows {
            let cluster_count: (i64,) = sqlx::query_as(
                "SELECT COUNT(DISTINCT cluster_id) FROM pain_records
                 WHERE geo_region = $1 AND cluster_id IS NOT NULL",
            )
            .bind(&region)
            .fetch_one(&mut *tx)
            .await?;

            let top_topics: Vec<(String, i64)> = sqlx::query_as(
                "SELECT normalized_topic, COUNT(*) FROM pain_records
                 WHERE geo_region = $1 AND normalized_topic IS NOT NULL
                 GROUP BY normalized_topic ORDER BY COUNT(*) DESC LIMIT 5",
            )
            .bind(&region)
            .fetch_all(&mut *tx)
            .await?;
            let top_topics_json = serde_json::to_value(
                top_topics.into_iter().map(|(t, c)| serde_json::json!({"topic": t, "count": c})).collect::<Vec<_>>(),
            )
            .unwrap_or(serde_json::json!([]));

            sqlx::query(
                "INSERT INTO geo_stats (region, mention_count, cluster_count, top_topics, updated_at)
                 VALUES ($1, $2, $3, $4, now())
                 ON CONFLICT (region) DO UPDATE SET
                    mention_count = EXCLUDED.mention_count, cluster_count = EXCLUDED.cluster_count,
                    top_topics = EXCLUDED.top_topics, updated_at = now()",
            )
            .bind(&region)
            .bind(mention_count as i32)
            .bind(cluster_count.0 as i32)
            .bind(top_topics_json)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<GeoStats>, sqlx::Error> {
        sqlx::query_as::<_, GeoStats>("SELECT * FROM geo_stats ORDER BY mention_count DESC").fetch_all(pool).await
    }

    pub async fn by_region(pool: &PgPool, region: &str) -> Result<Option<GeoStats>, sqlx::Error> {
        sqlx::query_as::<_, GeoStats>("SELECT * FROM geo_stats WHERE region = $1").bind(region).fetch_optional(pool).await
    }
}
