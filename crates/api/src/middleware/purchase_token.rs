//! Purchase-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use liftlog_core::authorization::parse_purchase_authorization;
use liftlog_core::error::CoreError;
use liftlog_core::platform::Platform;

use crate::error::AppError;
use crate::state::AppState;

/// Message returned for any token the platform does not vouch for.
pub const INVALID_PURCHASE_TOKEN: &str = "Invalid purchase token";

/// Caller whose purchase token was verified against its platform.
///
/// The header carries the platform and the raw token:
///
/// ```text
/// Authorization: Bearer Google premium_monthly:abc123
/// ```
///
/// Use this as an extractor parameter in any gated handler:
///
/// ```ignore
/// async fn my_handler(auth: PurchaseTokenAuth) -> AppResult<Json<()>> {
///     tracing::info!(platform = %auth.platform, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PurchaseTokenAuth {
    pub platform: Platform,
    /// The raw token. Only ever persisted hashed.
    pub token: String,
    /// Platform-reported identity, when the platform returns one.
    pub subject_id: Option<String>,
}

impl FromRequestParts<AppState> for PurchaseTokenAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts.headers.get(AUTHORIZATION).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

        let auth_header = auth_header.to_str().map_err(|_| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization header format".into(),
            ))
        })?;

        let credentials = parse_purchase_authorization(auth_header)?;

        let result = state
            .verifier
            .verify(credentials.platform, &credentials.token)
            .await;

        if !result.valid {
            tracing::warn!(
                platform = %credentials.platform,
                detail = result.error_detail.as_deref().unwrap_or_default(),
                "Invalid purchase token"
            );
            return Err(AppError::Core(CoreError::Unauthorized(
                INVALID_PURCHASE_TOKEN.into(),
            )));
        }

        Ok(PurchaseTokenAuth {
            platform: credentials.platform,
            token: credentials.token,
            subject_id: result.subject_id,
        })
    }
}
