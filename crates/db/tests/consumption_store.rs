//! Integration tests for the consumption repository and the Postgres store.
//!
//! Exercises the real schema:
//! - hashed tokens only, never raw tokens
//! - window counting and the oldest-record lookup
//! - per-bucket serialization under concurrent writers

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use liftlog_core::error::StoreError;
use liftlog_core::hashing::hash_token;
use liftlog_core::platform::Platform;
use liftlog_core::rate_limit::{Bucket, ConsumptionStore, RateLimitConfig, RateLimiter};
use liftlog_db::repositories::RateLimitRepo;
use liftlog_db::store::PgConsumptionStore;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_window_stats_counts_only_recent_records(pool: PgPool) {
    let hashed = hash_token("repo-token");
    let now = Utc::now();

    RateLimitRepo::insert(&pool, &hashed, "Web", now - TimeDelta::hours(30))
        .await
        .unwrap();
    RateLimitRepo::insert(&pool, &hashed, "Web", now - TimeDelta::hours(5))
        .await
        .unwrap();
    RateLimitRepo::insert(&pool, &hashed, "Web", now - TimeDelta::hours(1))
        .await
        .unwrap();
    RateLimitRepo::insert(&pool, &hashed, "Google", now).await.unwrap();

    let stats = RateLimitRepo::window_stats(&pool, &hashed, "Web", now - TimeDelta::hours(24))
        .await
        .unwrap();

    assert_eq!(stats.used, 2);
    let oldest = stats.oldest.expect("oldest in-window record");
    assert!((oldest - (now - TimeDelta::hours(5))).num_milliseconds().abs() < 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_empty_bucket_has_no_oldest(pool: PgPool) {
    let stats = RateLimitRepo::window_stats(&pool, &hash_token("nobody"), "Apple", Utc::now())
        .await
        .unwrap();
    assert_eq!(stats.used, 0);
    assert!(stats.oldest.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_raw_token_is_rejected_by_schema(pool: PgPool) {
    let result = RateLimitRepo::insert(&pool, "raw-token", "Web", Utc::now()).await;
    assert!(result.is_err(), "only 64-char hex digests may be stored");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_platform_is_rejected_by_schema(pool: PgPool) {
    let result = RateLimitRepo::insert(&pool, &hash_token("t"), "Steam", Utc::now()).await;
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_store_persists_hashed_token(pool: PgPool) {
    let store = PgConsumptionStore::new(pool.clone());
    let bucket = Bucket::for_token(Platform::Web, "sensitive-token-123");
    let now = Utc::now();

    let usage = store
        .try_consume(&bucket, now - TimeDelta::hours(24), now, 5)
        .await
        .unwrap();
    assert!(usage.consumed);
    assert_eq!(usage.used, 0);

    let rows = RateLimitRepo::list_for_bucket(&pool, &bucket.hashed_token, "Web")
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_ne!(rows[0].hashed_token, "sensitive-token-123");
    assert_eq!(rows[0].hashed_token.len(), 64);
    assert_eq!(rows[0].platform, "Web");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_store_health_check_passes_and_fails_after_close(pool: PgPool) {
    let store = PgConsumptionStore::new(pool.clone());
    store.health_check().await.unwrap();

    pool.close().await;
    assert!(matches!(
        store.health_check().await,
        Err(StoreError::Unavailable(_))
    ));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_limiter_over_postgres_limits_after_quota(pool: PgPool) {
    let store = Arc::new(PgConsumptionStore::new(pool));
    let config = RateLimitConfig {
        web_daily_quota: 100,
        mobile_daily_quota: 3,
        bypass: false,
    };
    let limiter = RateLimiter::new(store, config);

    for n in 1..=3 {
        let decision = limiter
            .check_and_consume(Platform::Google, "pg-token")
            .await
            .unwrap();
        assert!(!decision.limited);
        assert_eq!(decision.used, n);
    }

    let decision = limiter
        .check_and_consume(Platform::Google, "pg-token")
        .await
        .unwrap();
    assert!(decision.limited);
    assert_eq!(decision.used, 3);
    assert!(decision.retry_after.unwrap() > Utc::now() + TimeDelta::hours(23));
}

/// 2×N concurrent attempts on one bucket admit exactly N.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_consumption_is_serialized_per_bucket(pool: PgPool) {
    const N: i64 = 10;
    let store = Arc::new(PgConsumptionStore::new(pool.clone()));
    let bucket = Bucket::for_token(Platform::Apple, "contended");
    let now = Utc::now();
    let window_start = now - TimeDelta::hours(24);

    let attempts = (0..2 * N).map(|_| {
        let store = Arc::clone(&store);
        let bucket = bucket.clone();
        async move { store.try_consume(&bucket, window_start, now, N).await }
    });

    let results = futures::future::join_all(attempts).await;
    let admitted = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|usage| usage.consumed)
        .count() as i64;

    assert_eq!(admitted, N);

    let stats = RateLimitRepo::window_stats(&pool, &bucket.hashed_token, "Apple", window_start)
        .await
        .unwrap();
    assert_eq!(stats.used, N);
}
