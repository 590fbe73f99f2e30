use axum::extract::State;
use axum::{routing::get, Json, Router};

use crate::metrics::{MetricsSnapshot, MetricsSummary};
use crate::state::AppState;

/// GET /metrics -- per-endpoint counts, errors and latency.
async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// GET /metrics/summary
async fn summary(State(state): State<AppState>) -> Json<MetricsSummary> {
    Json(state.metrics.summary())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/metrics/summary", get(summary))
}
