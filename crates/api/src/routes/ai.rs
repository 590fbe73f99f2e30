use axum::routing::post;
use axum::Router;

use crate::handlers::ai;
use crate::state::AppState;

/// Routes mounted at `/api/v1/ai`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workout", post(ai::generate_workout))
        .route("/session", post(ai::generate_session))
}
