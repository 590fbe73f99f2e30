//! RevenueCat subscriber lookup.
//!
//! The token is a RevenueCat app user id. A subscriber is entitled when at
//! least one entitlement never expires or expires in the future.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use liftlog_core::platform::Platform;
use liftlog_core::verification::VerificationResult;
use serde::Deserialize;

use crate::error::VerificationError;
use crate::strategy::{endpoint_url, recover, VerificationStrategy};

pub const DEFAULT_BASE_URL: &str = "https://api.revenuecat.com/v1";

/// Error detail when no API key is configured.
pub const NOT_CONFIGURED: &str = "RevenueCat not configured";

pub const SUBSCRIBER_NOT_FOUND: &str = "Subscriber not found";

pub const NO_ACTIVE_ENTITLEMENTS: &str = "No active entitlements";

const LABEL: &str = "RevenueCat";

/// Configuration for [`RevenueCatVerifier`].
#[derive(Clone)]
pub struct RevenueCatConfig {
    /// Secret API key. `None` disables RevenueCat verification.
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for RevenueCatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubscriberResponse {
    #[serde(default)]
    subscriber: Subscriber,
}

#[derive(Debug, Default, Deserialize)]
struct Subscriber {
    original_app_user_id: Option<String>,
    #[serde(default)]
    entitlements: HashMap<String, Entitlement>,
}

#[derive(Debug, Deserialize)]
struct Entitlement {
    expires_date: Option<String>,
}

impl Entitlement {
    /// Non-expiring entitlements are always active; an unparseable expiry
    /// counts as expired.
    fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_date.as_deref() {
            None => true,
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|expiry| expiry.with_timezone(&Utc) > now)
                .unwrap_or(false),
        }
    }
}

/// Verifies RevenueCat subscriber ids.
pub struct RevenueCatVerifier {
    client: reqwest::Client,
    config: RevenueCatConfig,
}

impl RevenueCatVerifier {
    pub fn new(client: reqwest::Client, config: RevenueCatConfig) -> Self {
        Self { client, config }
    }

    async fn lookup(&self, api_key: &str, subscriber_id: &str) -> Result<VerificationResult, VerificationError> {
        let url = endpoint_url(&self.config.base_url, &["subscribers", subscriber_id])?;
        let response = self.client.get(url).bearer_auth(api_key).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(VerificationResult::invalid(Platform::RevenueCat, SUBSCRIBER_NOT_FOUND));
        }

        let response = VerificationError::ensure_success(response).await?;
        let body: SubscriberResponse = VerificationError::parse_json(response).await?;

        let now = Utc::now();
        let subscriber = body.subscriber;
        let entitled = subscriber
            .entitlements
            .values()
            .any(|entitlement| entitlement.is_active_at(now));

        if entitled {
            Ok(VerificationResult::valid(Platform::RevenueCat, subscriber.original_app_user_id))
        } else {
            Ok(VerificationResult::invalid(Platform::RevenueCat, NO_ACTIVE_ENTITLEMENTS)
                .with_subject(subscriber.original_app_user_id))
        }
    }
}

#[async_trait]
impl VerificationStrategy for RevenueCatVerifier {
    fn platform(&self) -> Platform {
        Platform::RevenueCat
    }

    async fn verify(&self, token: &str) -> VerificationResult {
        let Some(api_key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            tracing::warn!("RevenueCat verification not configured");
            return VerificationResult::invalid(Platform::RevenueCat, NOT_CONFIGURED);
        };

        recover(Platform::RevenueCat, LABEL, self.lookup(api_key, token).await)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn entitlement(expires_date: Option<&str>) -> Entitlement {
        Entitlement {
            expires_date: expires_date.map(str::to_string),
        }
    }

    #[test]
    fn non_expiring_entitlement_is_active() {
        assert!(entitlement(None).is_active_at(Utc::now()));
    }

    #[test]
    fn expiry_must_be_strictly_in_the_future() {
        let now = Utc::now();
        let future = (now + TimeDelta::days(1)).to_rfc3339();
        let past = (now - TimeDelta::days(1)).to_rfc3339();

        assert!(entitlement(Some(&future)).is_active_at(now));
        assert!(!entitlement(Some(&past)).is_active_at(now));
        assert!(!entitlement(Some(&now.to_rfc3339())).is_active_at(now));
    }

    #[test]
    fn z_suffix_is_accepted() {
        let now = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(entitlement(Some("2024-06-01T00:00:00Z")).is_active_at(now));
    }

    #[test]
    fn unparseable_expiry_is_expired() {
        assert!(!entitlement(Some("next tuesday")).is_active_at(Utc::now()));
        assert!(!entitlement(Some("")).is_active_at(Utc::now()));
    }

    #[tokio::test]
    async fn not_configured_without_key() {
        let verifier = RevenueCatVerifier::new(reqwest::Client::new(), RevenueCatConfig::default());
        let result = verifier.verify("user").await;
        assert!(!result.valid);
        assert_eq!(result.error_detail.as_deref(), Some(NOT_CONFIGURED));
    }
}
