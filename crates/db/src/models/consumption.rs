//! Rate-limit consumption records.

use liftlog_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `rate_limit_consumptions` table (append-only).
///
/// One row per admitted AI generation request. `platform` holds the string
/// form of [`liftlog_core::platform::Platform`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConsumptionRecord {
    pub id: DbId,
    #[serde(skip_serializing)]
    pub hashed_token: String,
    pub platform: String,
    pub consumed_at: Timestamp,
}

/// Aggregate over a bucket's in-window records.
#[derive(Debug, Clone, FromRow)]
pub struct WindowStats {
    pub used: i64,
    pub oldest: Option<Timestamp>,
}
