//! Market size estimates, one per cluster (C13a).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MarketEstimate {
    pub id: i64,
    pub cluster_id: i64,
    pub tam_low: Option<i64>,
    pub tam_high: Option<i64>,
    pub sam_estimate: Option<i64>,
    pub reasoning: Option<String>,
    pub confidence: String,
    pub estimated_at: DateTime<Utc>,
}

pub struct NewMarketEstimate {
    pub cluster_id: i64,
    pub tam_low: Option<i64>,
    pub tam_high: Option<i64>,
    pub sam_estimate: Option<i64>,
    pub reasoning: Option<String>,
    pub confidence: String,
}

pub struct MarketStore;

impl MarketStore {
    pub async fn upsert(pool: &PgPool, m: &NewMarketEstimate) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO market_estimates (cluster_id, tam_low, tam_high, sam_estimate, reasoning, confidence)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (cluster_id) DO UPDATE SET
                tam_low = EXCLUDED.tam_low, tam_high = EXCLUDED.tam_high, sam_estimate = EXCLUDED.sam_estimate,
                reasoning = EXCLUDED.reasoning, confidence = EXCLUDED.confidence, estimated_at = now()",
        )
        .bind(m.cluster_id)
        .bind(m.tam_low)
        .bind(m.tam_high)
        .bind(m.sam_estimate)
        .bind(&m.reasoning)
        .bind(&m.confidence)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn by_cluster(pool: &PgPool, cluster_id: i64) -> Result<Option<MarketEstimate>, sqlx::Error> {
        sqlx::query_as::<_, MarketEstimate>("SELECT * FROM market_estimates WHERE cluster_id = $1")
            .bind(cluster_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn top_by_tam(pool: &PgPool, limit: i64) -> Result<Vec<MarketEstimate>, sqlx::Error> {
        sqlx::query_as::<_, MarketEstimate>(
            "SELECT * FROM market_estimates ORDER BY tam_high DESC NULLS LAST LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
