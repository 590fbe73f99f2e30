//! Repository for the `rate_limit_consumptions` table.

use liftlog_core::types::Timestamp;
use sqlx::PgExecutor;

use crate::models::consumption::{ConsumptionRecord, WindowStats};

/// Column list for `rate_limit_consumptions` queries.
const COLUMNS: &str = "id, hashed_token, platform, consumed_at";

/// Query helpers for rate-limit consumption records.
///
/// Methods take any [`PgExecutor`] so they compose inside a transaction.
pub struct RateLimitRepo;

impl RateLimitRepo {
    /// Take a transaction-scoped advisory lock for a bucket key.
    ///
    /// The lock is released automatically when the surrounding transaction
    /// commits or rolls back. Concurrent callers for the same key block here.
    pub async fn lock_bucket<'e, E: PgExecutor<'e>>(
        executor: E,
        bucket_key: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(bucket_key)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Count a bucket's records at or after `window_start`, with the oldest
    /// such timestamp.
    pub async fn window_stats<'e, E: PgExecutor<'e>>(
        executor: E,
        hashed_token: &str,
        platform: &str,
        window_start: Timestamp,
    ) -> Result<WindowStats, sqlx::Error> {
        sqlx::query_as::<_, WindowStats>(
            "SELECT COUNT(*) AS used, MIN(consumed_at) AS oldest \
             FROM rate_limit_consumptions \
             WHERE hashed_token = $1 AND platform = $2 AND consumed_at >= $3",
        )
        .bind(hashed_token)
        .bind(platform)
        .bind(window_start)
        .fetch_one(executor)
        .await
    }

    /// Append a consumption record.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        hashed_token: &str,
        platform: &str,
        consumed_at: Timestamp,
    ) -> Result<ConsumptionRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO rate_limit_consumptions (hashed_token, platform, consumed_at) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ConsumptionRecord>(&query)
            .bind(hashed_token)
            .bind(platform)
            .bind(consumed_at)
            .fetch_one(executor)
            .await
    }

    /// List every record for a bucket, oldest first.
    pub async fn list_for_bucket<'e, E: PgExecutor<'e>>(
        executor: E,
        hashed_token: &str,
        platform: &str,
    ) -> Result<Vec<ConsumptionRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rate_limit_consumptions \
             WHERE hashed_token = $1 AND platform = $2 \
             ORDER BY consumed_at ASC, id ASC"
        );
        sqlx::query_as::<_, ConsumptionRecord>(&query)
            .bind(hashed_token)
            .bind(platform)
            .fetch_all(executor)
            .await
    }
}
