//! PainCluster + ClusterMember store (C6/C7/C8/C9). Owns the rollup
//! invariants I1–I3: membership rows mirror `cluster_id`, rollup counts
//! mirror the membership set, `version` is non-decreasing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PainCluster {
    pub id: i64,
    pub centroid_text: String,
    pub topic_canonical: String,
    pub broad_category: String,
    pub centroid_embedding_id: i64,
    pub product_name: Option<String>,
    pub tagline: Option<String>,
    pub how_it_works: Option<serde_json::Value>,
    pub target_customer: Option<String>,
    pub social_proof_count: i32,
    pub last_synth_count: i32,
    pub version: i32,
    pub member_count: i32,
    pub unique_authors: i32,
    pub subreddit_count: i32,
    pub total_upvotes: i64,
    pub total_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub synthesized_at: Option<DateTime<Utc>>,
    pub scored_at: Option<DateTime<Utc>>,
    pub top_quotes: Option<serde_json::Value>,
    pub subreddits_list: Option<serde_json::Value>,
    pub categories: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClusterMember {
    pub cluster_id: i64,
    pub pain_record_id: i64,
    pub similarity_score: f64,
    pub added_at: DateTime<Utc>,
}

/// A member row joined with the fields needed for rollup recomputation and
/// top-quote selection.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MemberForRollup {
    pub pain_record_id: i64,
    pub author: String,
    pub subreddit: String,
    pub source_score: i64,
    pub raw_quote: String,
    pub severity: Option<String>,
    pub persona: Option<String>,
}

pub struct NewCluster {
    pub centroid_text: String,
    pub topic_canonical: String,
    pub broad_category: String,
    pub centroid_embedding_id: i64,
}

pub struct ClusterStore;

impl ClusterStore {
    /// All clusters, for centroid scanning by the clusterer (C6) and merger
    /// (C7). Small-scale deployments keep this in memory per phase.
    pub async fn all(pool: &PgPool) -> Result<Vec<PainCluster>, sqlx::Error> {
        sqlx::query_as::<_, PainCluster>("SELECT * FROM pain_clusters ORDER BY id").fetch_all(pool).await
    }

    pub async fn by_id(pool: &PgPool, id: i64) -> Result<Option<PainCluster>, sqlx::Error> {
        sqlx::query_as::<_, PainCluster>("SELECT * FROM pain_clusters WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn by_topic(pool: &PgPool, topic_canonical: &str) -> Result<Vec<PainCluster>, sqlx::Error> {
        sqlx::query_as::<_, PainCluster>("SELECT * FROM pain_clusters WHERE topic_canonical = $1")
            .bind(topic_canonical)
            .fetch_all(pool)
            .await
    }

    /// Open a new cluster (§4.6 step 2). Version starts at 0, counts start
    /// at 1 — the caller must also insert the first membership row.
    pub async fn create(pool: &PgPool, c: &NewCluster) -> Result<i64, sqlx::Error> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO pain_clusters
                (centroid_text, topic_canonical, broad_category, centroid_embedding_id, version, member_count)
             VALUES ($1, $2, $3, $4, 0, 0)
             RETURNING id",
        )
        .bind(&c.centroid_text)
        .bind(&c.topic_canonical)
        .bind(&c.broad_category)
        .bind(c.centroid_embedding_id)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    /// Insert-or-ignore a membership row (§4.6 step 3).
    pub async fn add_member(
        pool: &PgPool,
        cluster_id: i64,
        pain_record_id: i64,
        similarity: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO cluster_members (cluster_id, pain_record_id, similarity_score)
             VALUES ($1, $2, $3)
             ON CONFLICT (cluster_id, pain_record_id) DO NOTHING",
        )
        .bind(cluster_id)
        .bind(pain_record_id)
        .bind(similarity)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn members_for_rollup(pool: &PgPool, cluster_id: i64) -> Result<Vec<MemberForRollup>, sqlx::Error> {
        sqlx::query_as::<_, MemberForRollup>(
            "SELECT pr.id AS pain_record_id, pr.author, pr.subreddit, pr.source_score, pr.raw_quote, pr.severity, pr.persona
             FROM cluster_members cm
             JOIN pain_records pr ON pr.id = cm.pain_record_id
             WHERE cm.cluster_id = $1",
        )
        .bind(cluster_id)
        .fetch_all(pool)
        .await
    }

    /// Recompute `member_count`, `unique_authors`, `subreddit_count`,
    /// `total_upvotes`, `subreddits_list`, and `top_quotes` from the current
    /// membership set (I2; §4.6 step 4). Must run inside the same phase
    /// commit that mutated membership, per O2.
    pub async fn recompute_rollups(pool: &PgPool, cluster_id: i64) -> Result<(), sqlx::Error> {
        let members = Self::members_for_rollup(pool, cluster_id).await?;

        let member_count = members.len() as i32;
        let unique_authors = members.iter().map(|m| &m.author).collect::<std::collections::HashSet<_>>().len() as i32;
        let subreddits: std::collections::BTreeSet<&str> = members.iter().map(|m| m.subreddit.as_str()).collect();
        let subreddit_count = subreddits.len() as i32;
        let total_upvotes: i64 = members.iter().map(|m| m.source_score).sum();

        // Up to 5 quotes, one per distinct author, sorted by source score desc.
        let mut sorted = members.clone();
        sorted.sort_by(|a, b| b.source_score.cmp(&a.source_score));
        let mut seen_authors = std::collections::HashSet::new();
        let mut top_quotes = Vec::new();
        for m in &sorted {
            if top_quotes.len() >= 5 {
                break;
            }
            if seen_authors.insert(m.author.clone()) {
                top_quotes.push(serde_json::json!({
                    "author": m.author,
                    "quote": m.raw_quote,
                    "score": m.source_score,
                }));
            }
        }

        let subreddits_json = serde_json::to_value(subreddits).unwrap_or(serde_json::json!([]));
        let top_quotes_json = serde_json::to_value(top_quotes).unwrap_or(serde_json::json!([]));

        sqlx::query(
            "UPDATE pain_clusters
             SET member_count = $2, social_proof_count = $2, unique_authors = $3, subreddit_count = $4,
                 total_upvotes = $5, subreddits_list = $6, top_quotes = $7, updated_at = now()
             WHERE id = $1",
        )
        .bind(cluster_id)
        .bind(member_count)
        .bind(unique_authors)
        .bind(subreddit_count)
        .bind(total_upvotes)
        .bind(subreddits_json)
        .bind(top_quotes_json)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Synthesis apply (§4.8): bump version by exactly 1, write
    /// `last_synth_count := member_count` observed at gating time (O3
    /// compare-and-write — only applies if `last_synth_count` still matches
    /// what the caller read, preventing a lost update from a concurrent
    /// membership change).
    pub async fn apply_synthesis(
        pool: &PgPool,
        cluster_id: i64,
        expected_last_synth_count: i32,
        product_name: &str,
        tagline: &str,
        how_it_works: &serde_json::Value,
        target_customer: &str,
        member_count_at_gate: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pain_clusters
             SET product_name = $3, tagline = $4, how_it_works = $5, target_customer = $6,
                 last_synth_count = $7, version = version + 1, synthesized_at = now(), updated_at = now()
             WHERE id = $1 AND last_synth_count = $2",
        )
        .bind(cluster_id)
        .bind(expected_last_synth_count)
        .bind(product_name)
        .bind(tagline)
        .bind(how_it_works)
        .bind(target_customer)
        .bind(member_count_at_gate)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn apply_score(pool: &PgPool, cluster_id: i64, total_score: f64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE pain_clusters SET total_score = $2, scored_at = now() WHERE id = $1")
            .bind(cluster_id)
            .bind(total_score)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_categories(pool: &PgPool, cluster_id: i64, categories: &[String]) -> Result<(), sqlx::Error> {
        let json = serde_json::to_value(categories).unwrap_or(serde_json::json!([]));
        sqlx::query("UPDATE pain_clusters SET categories = $2 WHERE id = $1")
            .bind(cluster_id)
            .bind(json)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Reparent every member row from `from` to `to` (§4.7 apply-merges step
    /// b). `ON CONFLICT DO NOTHING` so a pain record already in `to` isn't
    /// duplicated.
    pub async fn reparent_members(pool: &PgPool, from_cluster: i64, to_cluster: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO cluster_members (cluster_id, pain_record_id, similarity_score, added_at)
             SELECT $2, pain_record_id, similarity_score, added_at FROM cluster_members WHERE cluster_id = $1
             ON CONFLICT (cluster_id, pain_record_id) DO NOTHING",
        )
        .bind(from_cluster)
        .bind(to_cluster)
        .execute(pool)
        .await?;
        sqlx::query("DELETE FROM cluster_members WHERE cluster_id = $1").bind(from_cluster).execute(pool).await?;
        Ok(())
    }

    /// Delete a cluster — terminal, only reachable via a C7 merge once its
    /// members have been reassigned (§3 lifecycle).
    pub async fn delete(pool: &PgPool, cluster_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM pain_clusters WHERE id = $1").bind(cluster_id).execute(pool).await?;
        Ok(())
    }

    pub async fn list_sorted(
        pool: &PgPool,
        min_mentions: i32,
        sort_by: &str,
        limit: i64,
    ) -> Result<Vec<PainCluster>, sqlx::Error> {
        let order_col = match sort_by {
            "market_tam" => "total_score", // market join handled by server layer
            "total_score" => "total_score",
            _ => "social_proof_count",
        };
        let sql = format!(
            "SELECT * FROM pain_clusters WHERE member_count >= $1 ORDER BY {} DESC NULLS LAST LIMIT $2",
            order_col
        );
        sqlx::query_as::<_, PainCluster>(&sql).bind(min_mentions).bind(limit).fetch_all(pool).await
    }
}
