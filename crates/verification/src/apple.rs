//! App Store receipt verification via the `verifyReceipt` endpoint.
//!
//! The production endpoint is always tried first. A receipt minted in the
//! sandbox comes back with status [`STATUS_SANDBOX_RECEIPT`], in which case
//! the same payload is replayed once against the sandbox endpoint and that
//! answer is final.

use async_trait::async_trait;
use chrono::Utc;
use liftlog_core::platform::Platform;
use liftlog_core::verification::VerificationResult;
use serde::Deserialize;

use crate::error::VerificationError;
use crate::strategy::{recover, VerificationStrategy};

pub const PRODUCTION_URL: &str = "https://buy.itunes.apple.com/verifyReceipt";
pub const SANDBOX_URL: &str = "https://sandbox.itunes.apple.com/verifyReceipt";

/// Error detail when no shared secret is configured.
pub const NOT_CONFIGURED: &str = "Apple verification not configured";

/// Error detail for a readable receipt without a live subscription.
pub const NO_ACTIVE_SUBSCRIPTION: &str = "No active subscription";

/// Top-level status for a valid receipt.
pub const STATUS_OK: i64 = 0;

/// Top-level status for a sandbox receipt sent to production.
pub const STATUS_SANDBOX_RECEIPT: i64 = 21007;

const LABEL: &str = "Apple";

/// Configuration for [`AppleVerifier`].
#[derive(Clone)]
pub struct AppleConfig {
    /// App-specific shared secret. `None` disables Apple verification.
    pub shared_secret: Option<String>,
    pub production_url: String,
    pub sandbox_url: String,
}

impl Default for AppleConfig {
    fn default() -> Self {
        Self {
            shared_secret: None,
            production_url: PRODUCTION_URL.to_string(),
            sandbox_url: SANDBOX_URL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VerifyReceiptResponse {
    #[serde(default = "missing_status")]
    status: i64,
    #[serde(default)]
    receipt: Option<Receipt>,
    #[serde(default)]
    latest_receipt_info: Vec<ReceiptInfo>,
}

#[derive(Debug, Deserialize)]
struct Receipt {
    original_application_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReceiptInfo {
    /// Apple sends this as a decimal string; numbers are accepted too.
    #[serde(default)]
    expires_date_ms: Option<serde_json::Value>,
}

fn missing_status() -> i64 {
    -1
}

impl ReceiptInfo {
    fn expires_at_ms(&self) -> Option<i64> {
        match self.expires_date_ms.as_ref()? {
            serde_json::Value::String(s) => s.trim().parse().ok(),
            serde_json::Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Verifies base64 App Store receipts.
pub struct AppleVerifier {
    client: reqwest::Client,
    config: AppleConfig,
}

impl AppleVerifier {
    pub fn new(client: reqwest::Client, config: AppleConfig) -> Self {
        Self { client, config }
    }

    async fn verify_receipt(
        &self,
        secret: &str,
        receipt_data: &str,
    ) -> Result<VerificationResult, VerificationError> {
        let mut response = self
            .post_receipt(&self.config.production_url, secret, receipt_data)
            .await?;

        if response.status == STATUS_SANDBOX_RECEIPT {
            tracing::info!("Receipt is from the sandbox environment, retrying against sandbox");
            response = self
                .post_receipt(&self.config.sandbox_url, secret, receipt_data)
                .await?;
        }

        if response.status != STATUS_OK {
            let message = status_message(response.status);
            tracing::warn!(status = response.status, message = %message, "Apple receipt verification failed");
            return Ok(VerificationResult::invalid(Platform::Apple, message));
        }

        let subject_id = response
            .receipt
            .and_then(|receipt| receipt.original_application_version);
        let now_ms = Utc::now().timestamp_millis();
        let active = response
            .latest_receipt_info
            .iter()
            .filter_map(ReceiptInfo::expires_at_ms)
            .any(|expires_ms| expires_ms > now_ms);

        if active {
            Ok(VerificationResult::valid(Platform::Apple, subject_id))
        } else {
            Ok(VerificationResult::invalid(Platform::Apple, NO_ACTIVE_SUBSCRIPTION).with_subject(subject_id))
        }
    }

    async fn post_receipt(
        &self,
        url: &str,
        secret: &str,
        receipt_data: &str,
    ) -> Result<VerifyReceiptResponse, VerificationError> {
        let body = serde_json::json!({
            "receipt-data": receipt_data,
            "password": secret,
            "exclude-old-transactions": true,
        });

        let response = self.client.post(url).json(&body).send().await?;
        let response = VerificationError::ensure_success(response).await?;
        VerificationError::parse_json(response).await
    }
}

#[async_trait]
impl VerificationStrategy for AppleVerifier {
    fn platform(&self) -> Platform {
        Platform::Apple
    }

    async fn verify(&self, token: &str) -> VerificationResult {
        let Some(secret) = self.config.shared_secret.as_deref().filter(|s| !s.is_empty()) else {
            tracing::warn!("Apple App Store verification not configured");
            return VerificationResult::invalid(Platform::Apple, NOT_CONFIGURED);
        };

        recover(Platform::Apple, LABEL, self.verify_receipt(secret, token).await)
    }
}

/// Human-readable message for a non-zero `verifyReceipt` status.
pub fn status_message(status: i64) -> String {
    let message = match status {
        21000 => "The App Store could not read the JSON object you provided.",
        21002 => "The data in the receipt-data property was malformed or missing.",
        21003 => "The receipt could not be authenticated.",
        21004 => "The shared secret you provided does not match the shared secret on file.",
        21005 => "The receipt server is not currently available.",
        21006 => "This receipt is valid but the subscription has expired.",
        21007 => "This receipt is from the test environment.",
        21008 => "This receipt is from the production environment.",
        21009 => "Internal data access error.",
        21010 => "The user account cannot be found or has been deleted.",
        other => return format!("Unknown status code: {other}"),
    };
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_status_messages() {
        assert_eq!(
            status_message(21003),
            "The receipt could not be authenticated."
        );
        assert_eq!(
            status_message(21010),
            "The user account cannot be found or has been deleted."
        );
    }

    #[test]
    fn unknown_status_falls_back() {
        assert_eq!(status_message(21001), "Unknown status code: 21001");
        assert_eq!(status_message(-1), "Unknown status code: -1");
    }

    #[test]
    fn expiry_accepts_string_and_number() {
        let info: ReceiptInfo = serde_json::from_str(r#"{"expires_date_ms": "1700000000000"}"#).unwrap();
        assert_eq!(info.expires_at_ms(), Some(1_700_000_000_000));

        let info: ReceiptInfo = serde_json::from_str(r#"{"expires_date_ms": 1700000000000}"#).unwrap();
        assert_eq!(info.expires_at_ms(), Some(1_700_000_000_000));

        let info: ReceiptInfo = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(info.expires_at_ms(), None);
    }

    #[test]
    fn missing_status_is_not_ok() {
        let response: VerifyReceiptResponse = serde_json::from_str("{}").unwrap();
        assert_ne!(response.status, STATUS_OK);
        assert!(response.latest_receipt_info.is_empty());
    }

    #[tokio::test]
    async fn not_configured_without_secret() {
        let verifier = AppleVerifier::new(reqwest::Client::new(), AppleConfig::default());
        let result = verifier.verify("receipt").await;
        assert!(!result.valid);
        assert_eq!(result.error_detail.as_deref(), Some(NOT_CONFIGURED));
    }
}
