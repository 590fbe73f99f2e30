//! Handlers for AI plan generation, gated by purchase token and rate limit.

use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use liftlog_core::rate_limit::RateLimitDecision;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::middleware::purchase_token::PurchaseTokenAuth;
use crate::planner::PlanKind;
use crate::state::AppState;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// POST /api/v1/ai/workout
pub async fn generate_workout(
    State(state): State<AppState>,
    auth: PurchaseTokenAuth,
    Json(request): Json<Value>,
) -> AppResult<Response> {
    generate(&state, &auth, PlanKind::Workout, request).await
}

/// POST /api/v1/ai/session
pub async fn generate_session(
    State(state): State<AppState>,
    auth: PurchaseTokenAuth,
    Json(request): Json<Value>,
) -> AppResult<Response> {
    generate(&state, &auth, PlanKind::Session, request).await
}

/// Consume one unit of the caller's window, then forward to the generator.
///
/// The unit stays consumed even if generation fails.
async fn generate(
    state: &AppState,
    auth: &PurchaseTokenAuth,
    kind: PlanKind,
    request: Value,
) -> AppResult<Response> {
    let decision = state
        .rate_limiter
        .check_and_consume(auth.platform, &auth.token)
        .await?;

    if decision.limited {
        return Err(AppError::RateLimited(decision));
    }

    tracing::info!(
        platform = %auth.platform,
        kind = kind.path(),
        used = decision.used,
        allowed = decision.allowed,
        "Generating plan"
    );

    let plan = state.plan_generator.generate(kind, request).await?;

    Ok((rate_limit_headers(&decision), Json(plan)).into_response())
}

/// `X-RateLimit-Limit` / `X-RateLimit-Remaining` for a decision.
pub fn rate_limit_headers(decision: &RateLimitDecision) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.allowed));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining()));
    headers
}
