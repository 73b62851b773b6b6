//! Orchestrator-owned global state (§5). A plain key/value table rather
//! than dedicated columns — the orchestrator is the only writer and the
//! key set is small and stable, so this mirrors the teacher's
//! `rules::scheduler` watermark table instead of growing a bespoke schema.

use sqlx::PgPool;

pub const KEY_CRON_COUNT: &str = "cron_count";
pub const KEY_CRON_IN_PROGRESS: &str = "cron_in_progress";
pub const KEY_COMPETITOR_VERTICAL_INDEX: &str = "competitor_vertical_index";
pub const KEY_LAST_TICK_AT: &str = "last_tick_at";
pub const KEY_BINARY_FILTER_DEFAULTED: &str = "binary_filter_defaulted";

pub struct ProcessingStateStore;

impl ProcessingStateStore {
    pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM processing_state WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    pub async fn set(pool: &PgPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO processing_state (key, value, updated_at) VALUES ($1, $2, now())
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get_i64(pool: &PgPool, key: &str, default: i64) -> Result<i64, sqlx::Error> {
        Ok(Self::get(pool, key).await?.and_then(|v| v.parse().ok()).unwrap_or(default))
    }

    /// Add `by` to the running counter at `key`, returning the new total.
    pub async fn incr_i64(pool: &PgPool, key: &str, by: i64) -> Result<i64, sqlx::Error> {
        let next = Self::get_i64(pool, key, 0).await? + by;
        Self::set(pool, key, &next.to_string()).await?;
        Ok(next)
    }

    /// Read-and-increment the tick counter, used for cron_count % N gating
    /// of lower-frequency enrichment phases (§4.13).
    pub async fn next_cron_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let current = Self::get_i64(pool, KEY_CRON_COUNT, 0).await?;
        let next = current + 1;
        Self::set(pool, KEY_CRON_COUNT, &next.to_string()).await?;
        Ok(next)
    }

    /// Advisory in-process-flag guarding against overlapping ticks if the
    /// scheduler loop is ever run with more than one worker (§5 "single
    /// mutable global"). `try_acquire` returns false if already held.
    pub async fn try_acquire_tick_lock(pool: &PgPool) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let held: Option<(String,)> =
            sqlx::query_as("SELECT value FROM processing_state WHERE key = $1 FOR UPDATE")
                .bind(KEY_CRON_IN_PROGRESS)
                .fetch_optional(&mut *tx)
                .await?;
        if held.map(|(v,)| v == "true").unwrap_or(false) {
            tx.commit().await?;
            return Ok(false);
        }
        sqlx::query(
            "INSERT INTO processing_state (key, value, updated_at) VALUES ($1, 'true', now())
             ON CONFLICT (key) DO UPDATE SET value = 'true', updated_at = now()",
        )
        .bind(KEY_CRON_IN_PROGRESS)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    pub async fn release_tick_lock(pool: &PgPool) -> Result<(), sqlx::Error> {
        Self::set(pool, KEY_CRON_IN_PROGRESS, "false").await
    }

    /// Rotating index into the competitor-mining vertical list (§4.12),
    /// incremented and wrapped by the caller against the known vertical count.
    pub async fn next_vertical_index(pool: &PgPool, vertical_count: i64) -> Result<i64, sqlx::Error> {
        if vertical_count <= 0 {
            return Ok(0);
        }
        let current = Self::get_i64(pool, KEY_COMPETITOR_VERTICAL_INDEX, 0).await?;
        let next = (current + 1) % vertical_count;
        Self::set(pool, KEY_COMPETITOR_VERTICAL_INDEX, &next.to_string()).await?;
        Ok(current % vertical_count)
    }
}
