use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use liftlog_core::error::{CoreError, StoreError};
use liftlog_core::rate_limit::RateLimitDecision;
use serde_json::json;

use crate::handlers::ai::rate_limit_headers;
use crate::planner::PlanError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `liftlog_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The rate-limit store failed; the request is not admitted.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller's window is full.
    #[error("Rate limit exceeded")]
    RateLimited(RateLimitDecision),

    /// The upstream plan generator failed.
    #[error(transparent)]
    PlanGenerator(#[from] PlanError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
            },

            // --- Rate limiting ---
            AppError::Store(err) => {
                tracing::error!(error = %err, "Rate limit store failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Rate limiting is temporarily unavailable".to_string(),
                )
            }
            AppError::RateLimited(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Rate limit exceeded".to_string(),
            ),

            // --- Upstream ---
            AppError::PlanGenerator(err) => {
                tracing::error!(error = %err, "Plan generator failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "BAD_GATEWAY",
                    "Plan generation failed".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        let mut response = (status, axum::Json(body)).into_response();

        if let AppError::RateLimited(decision) = &self {
            let headers = response.headers_mut();
            headers.extend(rate_limit_headers(decision));
            if let Ok(value) = HeaderValue::from_str(&decision.retry_after_header()) {
                headers.insert(RETRY_AFTER, value);
            }
        }

        response
    }
}
