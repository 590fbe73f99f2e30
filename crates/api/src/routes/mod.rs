pub mod ai;
pub mod health;
pub mod metrics;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ai/workout                                      generate program (purchase token, rate limited)
/// /ai/session                                      generate session (purchase token, rate limited)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/ai", ai::router())
}
