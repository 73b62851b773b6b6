//! Relational store for the pain-mining pipeline.
//!
//! One module per table family; each store is a stateless unit struct with
//! async methods taking `&PgPool`, mirroring the teacher's
//! `IngestionSourceStore` convention. All writes are idempotent: upserts are
//! `INSERT ... ON CONFLICT` keyed by domain identity, never read-modify-write
//! races on the database row itself.

pub mod alert;
pub mod cluster;
pub mod competitor;
pub mod embedding;
pub mod feature;
pub mod geo;
pub mod landing;
pub mod market;
pub mod outreach;
pub mod pain;
pub mod processing_state;
pub mod raw;
pub mod trend;
pub mod user;

pub use sqlx::PgPool;

/// Connect to Postgres and run migrations. Panics-free: returns an error the
/// caller logs and treats as fatal (storage-unavailable is the only hard
/// abort condition per §4.13).
pub async fn connect_and_migrate(config: &painmine_core::config::PostgresConfig) -> Result<PgPool, sqlx::Error> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_string())
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
