//! Sliding-window rate limiting for the AI generation gate.
//!
//! Each `(hashed token, platform)` pair is an independent [`Bucket`]. A call
//! is admitted while fewer than the platform's daily quota of consumptions
//! fall inside the last [`WINDOW_HOURS`] hours; every admitted call appends
//! a consumption record. The count-then-append step is delegated to a
//! [`ConsumptionStore`], which must make it atomic per bucket.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::hashing::hash_token;
use crate::platform::Platform;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of the sliding window in hours.
pub const WINDOW_HOURS: i64 = 24;

/// Default daily quota for web tokens.
pub const DEFAULT_WEB_DAILY_QUOTA: i64 = 100;

/// Default daily quota shared by Google, Apple and RevenueCat tokens.
pub const DEFAULT_MOBILE_DAILY_QUOTA: i64 = 20;

/// `allowed` reported by decisions made in bypass mode.
pub const BYPASS_ALLOWED: i64 = 999_999;

/// `Retry-After` value (seconds) used when a limited decision has no retry time.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 3600;

/// `strftime` pattern for an IMF-fixdate HTTP-date.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// The sliding window length.
pub fn window() -> TimeDelta {
    TimeDelta::hours(WINDOW_HOURS)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Quotas and bypass switch for the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Admitted calls per window for [`Platform::Web`].
    pub web_daily_quota: i64,
    /// Admitted calls per window for every mobile platform.
    pub mobile_daily_quota: i64,
    /// Admit everything without touching the store. Automated tests only.
    pub bypass: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            web_daily_quota: DEFAULT_WEB_DAILY_QUOTA,
            mobile_daily_quota: DEFAULT_MOBILE_DAILY_QUOTA,
            bypass: false,
        }
    }
}

impl RateLimitConfig {
    /// The quota that applies to `platform`.
    pub fn quota_for(&self, platform: Platform) -> i64 {
        if platform.is_mobile() {
            self.mobile_daily_quota
        } else {
            self.web_daily_quota
        }
    }
}

// ---------------------------------------------------------------------------
// Bucket / store port
// ---------------------------------------------------------------------------

/// The unit of rate-limit accounting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bucket {
    pub hashed_token: String,
    pub platform: Platform,
}

impl Bucket {
    /// Build the bucket for a raw token. The raw token is hashed immediately
    /// and never retained.
    pub fn for_token(platform: Platform, raw_token: &str) -> Self {
        Self {
            hashed_token: hash_token(raw_token),
            platform,
        }
    }

    /// A single string identifying the bucket, used as a lock key.
    pub fn key(&self) -> String {
        format!("{}:{}", self.hashed_token, self.platform)
    }
}

/// What a store observed while attempting a consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowUsage {
    /// In-window records for the bucket *before* this attempt.
    pub used: i64,
    /// Timestamp of the oldest in-window record, if any.
    pub oldest: Option<Timestamp>,
    /// Whether a new record was appended.
    pub consumed: bool,
}

/// Persistence for consumption records.
///
/// Implementations must make [`try_consume`](Self::try_consume) atomic per
/// bucket: two concurrent calls for the same bucket must never both see
/// `used < allowed` when only one slot remains.
#[async_trait]
pub trait ConsumptionStore: Send + Sync {
    /// Count the bucket's records with timestamp `>= window_start` and, if
    /// that count is below `allowed`, append a record stamped `now`.
    async fn try_consume(
        &self,
        bucket: &Bucket,
        window_start: Timestamp,
        now: Timestamp,
        allowed: i64,
    ) -> Result<WindowUsage, StoreError>;

    /// Confirm the store can currently serve consumption attempts.
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Outcome of [`RateLimiter::check_and_consume`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub limited: bool,
    /// Earliest instant capacity becomes available. Set only when limited.
    pub retry_after: Option<Timestamp>,
    /// Window occupancy. Includes the current call when it was admitted.
    pub used: i64,
    pub allowed: i64,
}

impl RateLimitDecision {
    /// Calls left in the window after this decision.
    pub fn remaining(&self) -> i64 {
        (self.allowed - self.used).max(0)
    }

    /// Value for an HTTP `Retry-After` header: an HTTP-date when a retry
    /// time is known, otherwise [`DEFAULT_RETRY_AFTER_SECS`].
    pub fn retry_after_header(&self) -> String {
        match self.retry_after {
            Some(at) => at.format(HTTP_DATE_FORMAT).to_string(),
            None => DEFAULT_RETRY_AFTER_SECS.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Limiter
// ---------------------------------------------------------------------------

/// Sliding-window limiter over a shared [`ConsumptionStore`].
///
/// Constructed once at startup and shared behind an `Arc`.
pub struct RateLimiter {
    store: Arc<dyn ConsumptionStore>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a limiter using the system clock.
    pub fn new(store: Arc<dyn ConsumptionStore>, config: RateLimitConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    /// Create a limiter with an explicit clock.
    pub fn with_clock(
        store: Arc<dyn ConsumptionStore>,
        clock: Arc<dyn Clock>,
        config: RateLimitConfig,
    ) -> Self {
        if config.bypass {
            tracing::warn!("Rate limiter bypass is enabled; every request will be admitted");
        }
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Ask the backing store whether it can serve requests.
    pub async fn check_store(&self) -> Result<(), StoreError> {
        self.store.health_check().await
    }

    /// Decide whether a call for `(platform, raw_token)` is admitted, and
    /// record the consumption if so.
    ///
    /// Store failures are returned as errors; the limiter never admits a
    /// call it could not account for.
    pub async fn check_and_consume(
        &self,
        platform: Platform,
        raw_token: &str,
    ) -> Result<RateLimitDecision, StoreError> {
        if self.config.bypass {
            return Ok(RateLimitDecision {
                limited: false,
                retry_after: None,
                used: 0,
                allowed: BYPASS_ALLOWED,
            });
        }

        let bucket = Bucket::for_token(platform, raw_token);
        let allowed = self.config.quota_for(platform);
        let now = self.clock.now();
        let window_start = now - window();

        let usage = self
            .store
            .try_consume(&bucket, window_start, now, allowed)
            .await?;

        if usage.consumed {
            return Ok(RateLimitDecision {
                limited: false,
                retry_after: None,
                used: usage.used + 1,
                allowed,
            });
        }

        let retry_after = match usage.oldest {
            Some(oldest) => oldest + window(),
            None => {
                tracing::warn!(
                    platform = %platform,
                    used = usage.used,
                    allowed,
                    "Rate limit reached with no in-window record; retrying after a full window"
                );
                now + window()
            }
        };

        tracing::info!(
            platform = %platform,
            used = usage.used,
            allowed,
            %retry_after,
            "Rate limit exceeded"
        );

        Ok(RateLimitDecision {
            limited: true,
            retry_after: Some(retry_after),
            used: usage.used,
            allowed,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
