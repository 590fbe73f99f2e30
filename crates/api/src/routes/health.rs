use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// State of the consumption store behind the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Ok,
    Unavailable,
    /// Bypass mode: the store is never consulted.
    Bypassed,
}

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when gated routes would answer 503.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub rate_limit_store: StoreStatus,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let rate_limit_store = if state.rate_limiter.config().bypass {
        StoreStatus::Bypassed
    } else {
        match state.rate_limiter.check_store().await {
            Ok(()) => StoreStatus::Ok,
            Err(e) => {
                tracing::warn!(error = %e, "Rate limit store failed health check");
                StoreStatus::Unavailable
            }
        }
    };

    let status = match rate_limit_store {
        StoreStatus::Unavailable => "degraded",
        StoreStatus::Ok | StoreStatus::Bypassed => "ok",
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        rate_limit_store,
    })
}

/// Mounted at the root, next to `/metrics`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
