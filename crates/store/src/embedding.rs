//! Embedding store (C5). Vectors are persisted as JSONB arrays rounded to
//! 4 decimal places — §4.5.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmbeddingRow {
    pub id: i64,
    pub pain_record_id: i64,
    pub vector: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub struct EmbeddingStore;

impl EmbeddingStore {
    pub async fn insert(pool: &PgPool, pain_record_id: i64, vector: &[f32]) -> Result<i64, sqlx::Error> {
        let rounded = painmine_core::jsonguard::round_vector(vector);
        let json = serde_json::to_value(rounded).unwrap_or(serde_json::json!([]));
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO embeddings (pain_record_id, vector) VALUES ($1, $2)
             ON CONFLICT (pain_record_id) DO UPDATE SET vector = EXCLUDED.vector
             RETURNING id",
        )
        .bind(pain_record_id)
        .bind(json)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    pub async fn vector(pool: &PgPool, id: i64, expected_dims: usize) -> Result<Option<Vec<f32>>, sqlx::Error> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as("SELECT vector FROM embeddings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.and_then(|(v,)| painmine_core::jsonguard::parse_vector(&v, expected_dims)))
    }
}
