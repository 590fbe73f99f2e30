//! PostgreSQL-backed [`ConsumptionStore`].

use async_trait::async_trait;
use liftlog_core::error::StoreError;
use liftlog_core::rate_limit::{Bucket, ConsumptionStore, WindowUsage};
use liftlog_core::types::Timestamp;

use crate::repositories::RateLimitRepo;
use crate::DbPool;

/// Consumption store over the `rate_limit_consumptions` table.
///
/// Each attempt runs in its own transaction holding an advisory lock keyed
/// by the bucket, so the count and the conditional insert are serialized
/// per `(hashed_token, platform)` while unrelated buckets proceed in
/// parallel.
#[derive(Clone)]
pub struct PgConsumptionStore {
    pool: DbPool,
}

impl PgConsumptionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConsumptionStore for PgConsumptionStore {
    async fn try_consume(
        &self,
        bucket: &Bucket,
        window_start: Timestamp,
        now: Timestamp,
        allowed: i64,
    ) -> Result<WindowUsage, StoreError> {
        let platform = bucket.platform.as_str();
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        RateLimitRepo::lock_bucket(&mut *tx, &bucket.key())
            .await
            .map_err(store_error)?;

        let stats = RateLimitRepo::window_stats(&mut *tx, &bucket.hashed_token, platform, window_start)
            .await
            .map_err(store_error)?;

        let consumed = stats.used < allowed;
        if consumed {
            RateLimitRepo::insert(&mut *tx, &bucket.hashed_token, platform, now)
                .await
                .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)?;

        Ok(WindowUsage {
            used: stats.used,
            oldest: stats.oldest,
            consumed,
        })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool).await.map_err(store_error)
    }
}

/// Classify a sqlx error: connectivity problems are `Unavailable`,
/// everything else is a failed query.
fn store_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            tracing::error!(error = %err, "Consumption store unavailable");
            StoreError::Unavailable(err.to_string())
        }
        other => {
            tracing::error!(error = %other, "Consumption store query failed");
            StoreError::Query(other.to_string())
        }
    }
}
