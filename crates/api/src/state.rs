use std::sync::Arc;

use liftlog_core::rate_limit::RateLimiter;
use liftlog_verification::PurchaseVerifier;

use crate::config::ServerConfig;
use crate::metrics::RequestMetrics;
use crate::planner::PlanGenerator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Purchase-token verification, one strategy per platform.
    pub verifier: Arc<PurchaseVerifier>,
    /// Sliding-window limiter gating the AI routes.
    pub rate_limiter: Arc<RateLimiter>,
    /// Upstream plan generator.
    pub plan_generator: Arc<dyn PlanGenerator>,
    /// In-process request counters behind `/metrics`.
    pub metrics: RequestMetrics,
}
