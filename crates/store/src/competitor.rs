//! Competitor mining (C12). Insert-or-ignore keyed by URL — the same
//! product complaint thread surfaces repeatedly across cron ticks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Frustrated,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Frustrated => "frustrated",
            Sentiment::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompetitorMention {
    pub id: i64,
    pub vertical: String,
    pub product: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub sentiment: String,
    pub feature_gap: Option<String>,
    pub subreddit: String,
    pub found_at: DateTime<Utc>,
}

pub struct NewCompetitorMention {
    pub vertical: String,
    pub product: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub sentiment: Sentiment,
    pub feature_gap: Option<String>,
    pub subreddit: String,
}

pub struct CompetitorStore;

impl CompetitorStore {
    pub async fn insert(pool: &PgPool, m: &NewCompetitorMention) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "INSERT INTO competitor_mentions (vertical, product, url, title, snippet, sentiment, feature_gap, subreddit)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (url) DO NOTHING
             RETURNING id",
        )
        .bind(&m.vertical)
        .bind(&m.product)
        .bind(&m.url)
        .bind(&m.title)
        .bind(&m.snippet)
        .bind(m.sentiment.as_str())
        .bind(&m.feature_gap)
        .bind(&m.subreddit)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    pub async fn by_vertical(pool: &PgPool, vertical: &str, limit: i64) -> Result<Vec<CompetitorMention>, sqlx::Error> {
        sqlx::query_as::<_, CompetitorMention>(
            "SELECT * FROM competitor_mentions WHERE vertical = $1 ORDER BY found_at DESC LIMIT $2",
        )
        .bind(vertical)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<CompetitorMention>, sqlx::Error> {
        sqlx::query_as::<_, CompetitorMention>("SELECT * FROM competitor_mentions ORDER BY found_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn by_product(pool: &PgPool, product: &str, limit: i64) -> Result<Vec<CompetitorMention>, sqlx::Error> {
        sqlx::query_as::<_, CompetitorMention>(
            "SELECT * FROM competitor_mentions WHERE product ILIKE $1 ORDER BY found_at DESC LIMIT $2",
        )
        .bind(product)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn with_feature_gap(pool: &PgPool, limit: i64) -> Result<Vec<CompetitorMention>, sqlx::Error> {
        sqlx::query_as::<_, CompetitorMention>(
            "SELECT * FROM competitor_mentions WHERE feature_gap IS NOT NULL ORDER BY found_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
