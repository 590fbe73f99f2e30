//! In-process [`ConsumptionStore`] for embedded use and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::rate_limit::{Bucket, ConsumptionStore, WindowUsage};
use crate::types::Timestamp;

/// Consumption records held in memory.
///
/// A single mutex guards every bucket, which serializes the count-then-append
/// step. Records are never pruned.
#[derive(Debug, Default)]
pub struct InMemoryConsumptionStore {
    records: Mutex<HashMap<Bucket, Vec<Timestamp>>>,
    writes: AtomicU64,
}

impl InMemoryConsumptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total records appended since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of records held for a bucket, regardless of age.
    pub async fn record_count(&self, bucket: &Bucket) -> usize {
        self.records.lock().await.get(bucket).map_or(0, Vec::len)
    }
}

#[async_trait]
impl ConsumptionStore for InMemoryConsumptionStore {
    async fn try_consume(
        &self,
        bucket: &Bucket,
        window_start: Timestamp,
        now: Timestamp,
        allowed: i64,
    ) -> Result<WindowUsage, StoreError> {
        let mut records = self.records.lock().await;
        let entries = records.entry(bucket.clone()).or_default();

        let in_window = entries.iter().filter(|t| **t >= window_start);
        let used = in_window.clone().count() as i64;
        let oldest = in_window.min().copied();

        let consumed = used < allowed;
        if consumed {
            entries.push(now);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }

        Ok(WindowUsage {
            used,
            oldest,
            consumed,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::platform::Platform;

    #[tokio::test]
    async fn records_outside_window_are_ignored() {
        let store = InMemoryConsumptionStore::new();
        let bucket = Bucket::for_token(Platform::Web, "tok");
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        store.try_consume(&bucket, t0, t0, 1).await.unwrap();

        let later = t0 + TimeDelta::hours(25);
        let usage = store
            .try_consume(&bucket, later - TimeDelta::hours(24), later, 1)
            .await
            .unwrap();

        assert_eq!(usage.used, 0);
        assert_eq!(usage.oldest, None);
        assert!(usage.consumed);
        assert_eq!(store.record_count(&bucket).await, 2);
    }

    #[tokio::test]
    async fn full_bucket_reports_oldest_and_does_not_write() {
        let store = InMemoryConsumptionStore::new();
        let bucket = Bucket::for_token(Platform::Apple, "tok");
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let window_start = t0 - TimeDelta::hours(24);

        store.try_consume(&bucket, window_start, t0, 2).await.unwrap();
        store
            .try_consume(&bucket, window_start, t0 + TimeDelta::minutes(1), 2)
            .await
            .unwrap();
        let usage = store
            .try_consume(&bucket, window_start, t0 + TimeDelta::minutes(2), 2)
            .await
            .unwrap();

        assert_eq!(usage.used, 2);
        assert_eq!(usage.oldest, Some(t0));
        assert!(!usage.consumed);
        assert_eq!(store.write_count(), 2);
    }
}
