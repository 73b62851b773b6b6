//! C2 Raw Store — idempotent upsert of posts/comments keyed by source id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawPost {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub created_utc: i64,
    pub score: i64,
    pub num_comments: i64,
    pub url: Option<String>,
    pub permalink: Option<String>,
    pub sort_type: String,
    pub fetched_at: DateTime<Utc>,
    pub comments_fetched: i32,
    pub comments_fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawComment {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub body: String,
    pub author: String,
    pub created_utc: i64,
    pub score: i64,
    pub post_score: i64,
    pub post_title: String,
    pub subreddit: String,
    pub fetched_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub is_pain_point: Option<bool>,
}

/// A freshly-fetched post awaiting upsert.
pub struct NewRawPost {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub created_utc: i64,
    pub score: i64,
    pub num_comments: i64,
    pub url: Option<String>,
    pub permalink: Option<String>,
    pub sort_type: String,
}

/// A freshly-fetched comment awaiting upsert.
pub struct NewRawComment {
    pub id: String,
    pub post_id: String,
    pub parent_id: Option<String>,
    pub body: String,
    pub author: String,
    pub created_utc: i64,
    pub score: i64,
    pub post_score: i64,
    pub post_title: String,
    pub subreddit: String,
}

pub struct UpsertResult {
    pub inserted: bool,
}

pub struct RawStore;

impl RawStore {
    /// Insert-or-ignore a post by id. Returns whether a new row was created.
    pub async fn upsert_post(pool: &PgPool, p: &NewRawPost) -> Result<UpsertResult, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO raw_posts
                (id, subreddit, title, body, author, created_utc, score, num_comments, url, permalink, sort_type)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&p.id)
        .bind(&p.subreddit)
        .bind(&p.title)
        .bind(&p.body)
        .bind(&p.author)
        .bind(p.created_utc)
        .bind(p.score)
        .bind(p.num_comments)
        .bind(&p.url)
        .bind(&p.permalink)
        .bind(&p.sort_type)
        .execute(pool)
        .await?;
        Ok(UpsertResult { inserted: result.rows_affected() > 0 })
    }

    /// Insert-or-ignore a comment by id.
    pub async fn upsert_comment(pool: &PgPool, c: &NewRawComment) -> Result<UpsertResult, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO raw_comments
                (id, post_id, parent_id, body, author, created_utc, score, post_score, post_title, subreddit)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(&c.id)
        .bind(&c.post_id)
        .bind(&c.parent_id)
        .bind(&c.body)
        .bind(&c.author)
        .bind(c.created_utc)
        .bind(c.score)
        .bind(c.post_score)
        .bind(&c.post_title)
        .bind(&c.subreddit)
        .execute(pool)
        .await?;
        Ok(UpsertResult { inserted: result.rows_affected() > 0 })
    }

    /// Record the comments-fetched watermark for a post (§4.2).
    pub async fn set_comments_fetched(pool: &PgPool, post_id: &str, n: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE raw_posts SET comments_fetched = $2, comments_fetched_at = now() WHERE id = $1",
        )
        .bind(post_id)
        .bind(n)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Fetch a post's current comments-fetched watermark, used to skip
    /// already-fetched posts (§4.2).
    pub async fn comments_fetched(pool: &PgPool, post_id: &str) -> Result<i32, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT comments_fetched FROM raw_posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|(n,)| n).unwrap_or(0))
    }

    /// Select up to `limit` unprocessed comments (`is_pain_point IS NULL`,
    /// `length(body) >= 30`) ordered by score descending, for the binary
    /// filter (§4.3).
    pub async fn select_unprocessed_comments(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<RawComment>, sqlx::Error> {
        sqlx::query_as::<_, RawComment>(
            "SELECT id, post_id, parent_id, body, author, created_utc, score, post_score,
                    post_title, subreddit, fetched_at, processed_at, is_pain_point
             FROM raw_comments
             WHERE is_pain_point IS NULL AND length(body) >= 30
             ORDER BY score DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Mark a comment processed, writing both `processed_at` and
    /// `is_pain_point` atomically (I6).
    pub async fn mark_processed(pool: &PgPool, comment_id: &str, is_pain_point: bool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE raw_comments SET processed_at = now(), is_pain_point = $2 WHERE id = $1")
            .bind(comment_id)
            .bind(is_pain_point)
            .execute(pool)
            .await?;
        Ok(())
    }
}
