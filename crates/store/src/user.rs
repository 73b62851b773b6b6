//! Minimal user record, upserted from the decoded identity header on each
//! authenticated API request — not a credential store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub email: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

pub struct UserStore;

impl UserStore {
    pub async fn touch(pool: &PgPool, email: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO users (email) VALUES ($1)
             ON CONFLICT (email) DO UPDATE SET last_seen = now()",
        )
        .bind(email)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1").bind(email).fetch_optional(pool).await
    }
}
