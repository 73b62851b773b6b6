//! Outreach contact tracking (C13c). Rows are seeded by the pipeline from
//! high-signal cluster members; status transitions come from the read API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutreachContact {
    pub id: i64,
    pub cluster_id: i64,
    pub pain_record_id: i64,
    pub author: String,
    pub subreddit: String,
    pub source_url: Option<String>,
    pub contacted: bool,
    pub status: String,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
    pub status_updated_at: DateTime<Utc>,
}

pub struct NewOutreachContact {
    pub cluster_id: i64,
    pub pain_record_id: i64,
    pub author: String,
    pub subreddit: String,
    pub source_url: Option<String>,
}

pub struct OutreachStore;

impl OutreachStore {
    pub async fn seed(pool: &PgPool, c: &NewOutreachContact) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "INSERT INTO outreach_contacts (cluster_id, pain_record_id, author, subreddit, source_url)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT DO NOTHING
             RETURNING id",
        )
        .bind(c.cluster_id)
        .bind(c.pain_record_id)
        .bind(&c.author)
        .bind(&c.subreddit)
        .bind(&c.source_url)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    pub async fn by_cluster(pool: &PgPool, cluster_id: i64) -> Result<Vec<OutreachContact>, sqlx::Error> {
        sqlx::query_as::<_, OutreachContact>(
            "SELECT * FROM outreach_contacts WHERE cluster_id = $1 ORDER BY added_at DESC",
        )
        .bind(cluster_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_status(pool: &PgPool, id: i64, status: &str, notes: Option<&str>) -> Result<bool, sqlx::Error> {
        let contacted = status != "new";
        let result = sqlx::query(
            "UPDATE outreach_contacts SET status = $2, contacted = $3, notes = COALESCE($4, notes), status_updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(contacted)
        .bind(notes)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn all(pool: &PgPool, status: Option<&str>, limit: i64) -> Result<Vec<OutreachContact>, sqlx::Error> {
        match status {
            Some(s) => {
                sqlx::query_as::<_, OutreachContact>(
                    "SELECT * FROM outreach_contacts WHERE status = $1 ORDER BY added_at DESC LIMIT $2",
                )
                .bind(s)
                .bind(limit)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, OutreachContact>("SELECT * FROM outreach_contacts ORDER BY added_at DESC LIMIT $1")
                    .bind(limit)
                    .fetch_all(pool)
                    .await
            }
        }
    }
}
