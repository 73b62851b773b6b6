//! MVP feature suggestions, many per cluster (C13b).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Must,
    Should,
    Could,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Must => "must",
            Priority::Should => "should",
            Priority::Could => "could",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MvpFeature {
    pub id: i64,
    pub cluster_id: i64,
    pub feature_name: String,
    pub description: String,
    pub priority: String,
    pub effort_estimate: Option<String>,
    pub generated_at: DateTime<Utc>,
}

pub struct NewMvpFeature {
    pub cluster_id: i64,
    pub feature_name: String,
    pub description: String,
    pub priority: Priority,
    pub effort_estimate: Option<String>,
}

pub struct FeatureStore;

impl FeatureStore {
    /// Replaces the cluster's feature list wholesale — regeneration
    /// supersedes a prior run rather than accumulating stale rows.
    pub async fn replace_for_cluster(pool: &PgPool, cluster_id: i64, features: &[NewMvpFeature]) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM mvp_features WHERE cluster_id = $1").bind(cluster_id).execute(&mut *tx).await?;
        for f in features {
            sqlx::query(
                "INSERT INTO mvp_features (cluster_id, feature_name, description, priority, effort_estimate)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(f.cluster_id)
            .bind(&f.feature_name)
            .bind(&f.description)
            .bind(f.priority.as_str())
            .bind(&f.effort_estimate)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn by_cluster(pool: &PgPool, cluster_id: i64) -> Result<Vec<MvpFeature>, sqlx::Error> {
        sqlx::query_as::<_, MvpFeature>(
            "SELECT * FROM mvp_features WHERE cluster_id = $1 ORDER BY
                CASE priority WHEN 'must' THEN 0 WHEN 'should' THEN 1 ELSE 2 END, id",
        )
        .bind(cluster_id)
        .fetch_all(pool)
        .await
    }

    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<MvpFeature>, sqlx::Error> {
        sqlx::query_as::<_, MvpFeature>("SELECT * FROM mvp_features ORDER BY generated_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
