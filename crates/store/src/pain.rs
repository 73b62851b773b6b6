//! PainRecord store. Tagging/clustering/geo mutate only their own columns;
//! records are created once per `(source_type, source_id)` (§3 lifecycle).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Post,
    Comment,
    HnComment,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Post => "post",
            SourceType::Comment => "comment",
            SourceType::HnComment => "hn_comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Numeric weight for trend avg_severity (§4.10) and scorer
    /// severity_contribution (§4.9).
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PainRecord {
    pub id: i64,
    pub source_type: String,
    pub source_id: String,
    pub subreddit: String,
    pub raw_quote: String,
    pub author: String,
    pub source_score: i64,
    pub source_url: Option<String>,
    pub extracted_at: DateTime<Utc>,
    pub topics: Option<serde_json::Value>,
    pub persona: Option<String>,
    pub severity: Option<String>,
    pub tagged_at: Option<DateTime<Utc>>,
    pub embedding_id: Option<i64>,
    pub normalized_topic: Option<String>,
    pub cluster_id: Option<i64>,
    pub cluster_similarity: Option<f64>,
    pub geo_region: Option<String>,
    pub geo_confidence: Option<f64>,
    pub geo_signals: Option<serde_json::Value>,
}

pub struct NewPainRecord {
    pub source_type: SourceType,
    pub source_id: String,
    pub subreddit: String,
    pub raw_quote: String,
    pub author: String,
    pub source_score: i64,
    pub source_url: Option<String>,
}

const MAX_QUOTE_LEN: usize = 1500;

pub struct PainStore;

impl PainStore {
    /// Materialize a pain record once the binary filter accepts a source.
    /// `raw_quote` is truncated to 1500 chars (§4.3). Insert-or-ignore on
    /// `(source_type, source_id)`.
    pub async fn insert(pool: &PgPool, mut rec: NewPainRecord) -> Result<Option<i64>, sqlx::Error> {
        if rec.raw_quote.len() > MAX_QUOTE_LEN {
            rec.raw_quote.truncate(MAX_QUOTE_LEN);
        }
        let row: Option<(i64,)> = sqlx::query_as(
            "INSERT INTO pain_records (source_type, source_id, subreddit, raw_quote, author, source_score, source_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (source_type, source_id) DO NOTHING
             RETURNING id",
        )
        .bind(rec.source_type.as_str())
        .bind(&rec.source_id)
        .bind(&rec.subreddit)
        .bind(&rec.raw_quote)
        .bind(&rec.author)
        .bind(rec.source_score)
        .bind(&rec.source_url)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Records awaiting quality tagging (§4.4).
    pub async fn select_untagged(pool: &PgPool, limit: i64) -> Result<Vec<PainRecord>, sqlx::Error> {
        sqlx::query_as::<_, PainRecord>(
            "SELECT * FROM pain_records WHERE tagged_at IS NULL ORDER BY id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Apply tagging output: topics, persona, severity, normalized_topic,
    /// tagged_at (I4: topics non-empty and normalized_topic set whenever
    /// tagged_at is set).
    pub async fn apply_tagging(
        pool: &PgPool,
        id: i64,
        topics: &[String],
        persona: &str,
        severity: Severity,
        normalized_topic: &str,
    ) -> Result<(), sqlx::Error> {
        let topics_json = serde_json::to_value(topics).unwrap_or(serde_json::json!([]));
        sqlx::query(
            "UPDATE pain_records
             SET topics = $2, persona = $3, severity = $4, normalized_topic = $5, tagged_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(topics_json)
        .bind(persona)
        .bind(severity.as_str())
        .bind(normalized_topic)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Tagged records with no geo assignment yet (§4.13 step 4).
    pub async fn select_ungeotagged(pool: &PgPool, limit: i64) -> Result<Vec<PainRecord>, sqlx::Error> {
        sqlx::query_as::<_, PainRecord>(
            "SELECT * FROM pain_records WHERE tagged_at IS NOT NULL AND geo_region IS NULL ORDER BY id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Tagged records with no embedding yet (§4.13 step 5).
    pub async fn select_unembedded(pool: &PgPool, limit: i64) -> Result<Vec<PainRecord>, sqlx::Error> {
        sqlx::query_as::<_, PainRecord>(
            "SELECT * FROM pain_records WHERE tagged_at IS NOT NULL AND embedding_id IS NULL ORDER BY id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn set_embedding_id(pool: &PgPool, id: i64, embedding_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE pain_records SET embedding_id = $2 WHERE id = $1")
            .bind(id)
            .bind(embedding_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Tagged + embedded records with no cluster yet (C6 input set).
    pub async fn select_unclustered(pool: &PgPool, limit: i64) -> Result<Vec<PainRecord>, sqlx::Error> {
        sqlx::query_as::<_, PainRecord>(
            "SELECT * FROM pain_records
             WHERE embedding_id IS NOT NULL AND normalized_topic IS NOT NULL AND cluster_id IS NULL
             ORDER BY id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn assign_cluster(pool: &PgPool, id: i64, cluster_id: i64, similarity: f64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE pain_records SET cluster_id = $2, cluster_similarity = $3 WHERE id = $1")
            .bind(id)
            .bind(cluster_id)
            .bind(similarity)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn apply_geo(
        pool: &PgPool,
        id: i64,
        region: &str,
        confidence: f64,
        signals: &[String],
    ) -> Result<(), sqlx::Error> {
        let signals_json = serde_json::to_value(signals).unwrap_or(serde_json::json!([]));
        sqlx::query("UPDATE pain_records SET geo_region = $2, geo_confidence = $3, geo_signals = $4 WHERE id = $1")
            .bind(id)
            .bind(region)
            .bind(confidence)
            .bind(signals_json)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Reassign `normalized_topic` for all records under one topic during a
    /// merge (§4.7 apply-merges step a).
    pub async fn retarget_normalized_topic(pool: &PgPool, from: &str, to: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE pain_records SET normalized_topic = $2 WHERE normalized_topic = $1")
            .bind(from)
            .bind(to)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Reparent all pain_records from one cluster to another during a merge.
    pub async fn reparent_cluster(pool: &PgPool, from_cluster: i64, to_cluster: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE pain_records SET cluster_id = $2 WHERE cluster_id = $1")
            .bind(from_cluster)
            .bind(to_cluster)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn by_id(pool: &PgPool, id: i64) -> Result<Option<PainRecord>, sqlx::Error> {
        sqlx::query_as::<_, PainRecord>("SELECT * FROM pain_records WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn by_cluster(pool: &PgPool, cluster_id: i64, limit: i64) -> Result<Vec<PainRecord>, sqlx::Error> {
        sqlx::query_as::<_, PainRecord>(
            "SELECT * FROM pain_records WHERE cluster_id = $1 ORDER BY source_score DESC LIMIT $2",
        )
        .bind(cluster_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<PainRecord>, sqlx::Error> {
        sqlx::query_as::<_, PainRecord>("SELECT * FROM pain_records ORDER BY extracted_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Counts used by the trend snapshotter (§4.10): per-topic mention count
    /// and severity histogram for "today" (records extracted on `date`).
    pub async fn topic_mention_counts(pool: &PgPool, date: chrono::NaiveDate) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT normalized_topic, COUNT(*) FROM pain_records
             WHERE normalized_topic IS NOT NULL AND extracted_at::date = $1
             GROUP BY normalized_topic",
        )
        .bind(date)
        .fetch_all(pool)
        .await
    }

    /// Average severity weight per topic for `date`, and distinct subreddit
    /// count per topic for `date` (§4.10 `avg_severity`/`subreddit_spread`).
    pub async fn topic_avg_severity(pool: &PgPool, date: chrono::NaiveDate) -> Result<Vec<(String, Option<f64>)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT normalized_topic,
                    AVG(CASE severity WHEN 'low' THEN 1 WHEN 'medium' THEN 2 WHEN 'high' THEN 3 WHEN 'critical' THEN 4 END)
             FROM pain_records
             WHERE normalized_topic IS NOT NULL AND extracted_at::date = $1
             GROUP BY normalized_topic",
        )
        .bind(date)
        .fetch_all(pool)
        .await
    }

    pub async fn topic_subreddit_spread(pool: &PgPool, date: chrono::NaiveDate) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT normalized_topic, COUNT(DISTINCT subreddit) FROM pain_records
             WHERE normalized_topic IS NOT NULL AND extracted_at::date = $1
             GROUP BY normalized_topic",
        )
        .bind(date)
        .fetch_all(pool)
        .await
    }

    /// The first cluster id associated with a topic, used by the trend
    /// snapshotter to attach `cluster_id` to a snapshot row.
    pub async fn first_cluster_for_topic(pool: &PgPool, normalized_topic: &str) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(Option<i64>,)> = sqlx::query_as(
            "SELECT cluster_id FROM pain_records WHERE normalized_topic = $1 AND cluster_id IS NOT NULL LIMIT 1",
        )
        .bind(normalized_topic)
        .fetch_optional(pool)
        .await?;
        Ok(row.and_then(|(c,)| c))
    }
}
