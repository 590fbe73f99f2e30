//! Client for the upstream plan generator.
//!
//! Request and response bodies are opaque JSON; this server only gates and
//! forwards them.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Which generator endpoint a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// Multi-week workout program.
    Workout,
    /// Single workout session.
    Session,
}

impl PlanKind {
    pub fn path(self) -> &'static str {
        match self {
            PlanKind::Workout => "workout",
            PlanKind::Session => "session",
        }
    }
}

/// Errors from the plan generator.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The generator returned a non-2xx status code.
    #[error("Plan generator error ({status}): {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Produces plans from request attributes.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(&self, kind: PlanKind, request: Value) -> Result<Value, PlanError>;
}

/// [`PlanGenerator`] that POSTs to `{base_url}/workout` or `{base_url}/session`.
pub struct HttpPlanGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPlanGenerator {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a generator reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PlanGenerator for HttpPlanGenerator {
    async fn generate(&self, kind: PlanKind, request: Value) -> Result<Value, PlanError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, kind.path()))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PlanError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
