//! The per-platform verification capability.

use async_trait::async_trait;
use liftlog_core::platform::Platform;
use liftlog_core::verification::VerificationResult;

use crate::error::VerificationError;

/// Verifies tokens issued by one platform.
///
/// Implementations must not fail: configuration gaps, malformed tokens and
/// remote errors are all reported as an invalid [`VerificationResult`].
#[async_trait]
pub trait VerificationStrategy: Send + Sync {
    /// The platform this strategy handles.
    fn platform(&self) -> Platform;

    /// Verify a raw token.
    async fn verify(&self, token: &str) -> VerificationResult;
}

/// Fold a strategy's internal outcome into a result at the strategy boundary.
///
/// `label` is the human-facing platform name used in error details
/// (e.g. `"Google Play"`). Transport failures get a generic detail; the
/// underlying error is only logged.
pub(crate) fn recover(
    platform: Platform,
    label: &str,
    outcome: Result<VerificationResult, VerificationError>,
) -> VerificationResult {
    let err = match outcome {
        Ok(result) => return result,
        Err(err) => err,
    };

    let detail = match &err {
        VerificationError::HttpStatus { status, .. } => {
            tracing::warn!(%platform, error = %err, "Remote verification API rejected request");
            format!("{label} API error: {status}")
        }
        VerificationError::MalformedPayload(_) => {
            tracing::warn!(%platform, error = %err, "Remote verification API returned malformed payload");
            format!("Malformed {label} response")
        }
        VerificationError::Auth(_) => {
            tracing::error!(%platform, error = %err, "Verification API authentication failed");
            format!("{label} authentication failed")
        }
        VerificationError::Request(e) if e.is_timeout() => {
            tracing::error!(%platform, error = %err, "Verification request timed out");
            format!("{label} verification timed out")
        }
        VerificationError::Request(_) | VerificationError::Endpoint(_) => {
            tracing::error!(%platform, error = %err, "Verification request failed");
            format!("{label} verification request failed")
        }
    };

    VerificationResult::invalid(platform, detail)
}

/// Append path segments to a configured base URL, percent-encoding each one.
pub(crate) fn endpoint_url(base: &str, segments: &[&str]) -> Result<reqwest::Url, VerificationError> {
    let mut url = reqwest::Url::parse(base).map_err(|e| VerificationError::Endpoint(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| VerificationError::Endpoint(format!("{base}: cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
