//! Web access tokens signed by this server.

use async_trait::async_trait;
use liftlog_core::platform::Platform;
use liftlog_core::verification::VerificationResult;
use liftlog_core::web_token;

use crate::strategy::VerificationStrategy;

/// Error detail when no web auth secret is configured.
pub const NOT_CONFIGURED: &str = "Web auth not configured";

/// Configuration for [`WebVerifier`].
#[derive(Clone, Default)]
pub struct WebConfig {
    /// HMAC secret. `None` disables web verification.
    pub secret_key: Option<String>,
}

/// Verifies `subject.timestamp.signature` tokens locally; no network I/O.
pub struct WebVerifier {
    secret_key: Option<String>,
}

impl WebVerifier {
    pub fn new(config: WebConfig) -> Self {
        Self {
            secret_key: config.secret_key.filter(|s| !s.is_empty()),
        }
    }
}

#[async_trait]
impl VerificationStrategy for WebVerifier {
    fn platform(&self) -> Platform {
        Platform::Web
    }

    async fn verify(&self, token: &str) -> VerificationResult {
        let Some(secret) = self.secret_key.as_deref() else {
            tracing::warn!("Web auth verification not configured");
            return VerificationResult::invalid(Platform::Web, NOT_CONFIGURED);
        };

        match web_token::verify(secret, token) {
            Ok(subject_id) => VerificationResult::valid(Platform::Web, Some(subject_id.to_string())),
            Err(err) => VerificationResult::invalid(Platform::Web, err.to_string()),
        }
    }
}
