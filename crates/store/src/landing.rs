//! Landing page copy, one per cluster (C13d).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LandingPage {
    pub id: i64,
    pub cluster_id: i64,
    pub headline: String,
    pub subheadline: Option<String>,
    pub cta_text: String,
    pub body_sections: Option<serde_json::Value>,
    pub generated_at: DateTime<Utc>,
}

pub struct NewLandingPage {
    pub cluster_id: i64,
    pub headline: String,
    pub subheadline: Option<String>,
    pub cta_text: String,
    pub body_sections: serde_json::Value,
}

pub struct LandingStore;

impl LandingStore {
    pub async fn upsert(pool: &PgPool, p: &NewLandingPage) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO landing_pages (cluster_id, headline, subheadline, cta_text, body_sections)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (cluster_id) DO UPDATE SET
                headline = EXCLUDED.headline, subheadline = EXCLUDED.subheadline,
                cta_text = EXCLUDED.cta_text, body_sections = EXCLUDED.body_sections, generated_at = now()",
        )
        .bind(p.cluster_id)
        .bind(&p.headline)
        .bind(&p.subheadline)
        .bind(&p.cta_text)
        .bind(&p.body_sections)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn by_cluster(pool: &PgPool, cluster_id: i64) -> Result<Option<LandingPage>, sqlx::Error> {
        sqlx::query_as::<_, LandingPage>("SELECT * FROM landing_pages WHERE cluster_id = $1")
            .bind(cluster_id)
            .fetch_optional(pool)
            .await
    }
}
