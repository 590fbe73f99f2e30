//! Errors raised inside verification strategies.
//!
//! These never leave a strategy: [`crate::strategy::recover`] folds them into
//! an invalid result at the strategy boundary.

/// Internal failure while talking to a platform.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform returned a non-2xx status code.
    #[error("Remote API error ({status}): {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The platform answered 2xx with a body we could not interpret.
    #[error("Malformed response: {0}")]
    MalformedPayload(String),

    /// Obtaining credentials for the platform API failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A configured endpoint URL could not be used to build a request.
    #[error("Invalid endpoint URL: {0}")]
    Endpoint(String),
}

impl VerificationError {
    /// Ensure a response has a success status code, capturing the body on
    /// failure.
    pub(crate) async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, VerificationError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(VerificationError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Read and deserialize a JSON body, mapping decode failures to
    /// [`VerificationError::MalformedPayload`].
    pub(crate) async fn parse_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, VerificationError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| VerificationError::MalformedPayload(e.to_string()))
    }
}
