//! Google Play subscription verification.
//!
//! Tokens have the shape `productId:purchaseToken`. The subscription is
//! looked up through the Android Publisher v3 API using service-account
//! credentials (see [`auth`]).

pub mod auth;

use std::path::PathBuf;

use async_trait::async_trait;
use liftlog_core::platform::Platform;
use liftlog_core::verification::VerificationResult;
use serde::Deserialize;

use crate::error::VerificationError;
use crate::strategy::{endpoint_url, recover, VerificationStrategy};

use self::auth::{ServiceAccountAuth, ServiceAccountKey};

pub const DEFAULT_API_BASE_URL: &str = "https://androidpublisher.googleapis.com";

/// Error detail when credentials or the package name are missing.
pub const NOT_CONFIGURED: &str = "Google Play verification not configured";

pub const INVALID_TOKEN_FORMAT: &str = "Invalid token format";

pub const SUBSCRIPTION_NOT_ACTIVE: &str = "Subscription is not active";

/// `paymentState` value for a received payment.
const PAYMENT_RECEIVED: i64 = 1;

const LABEL: &str = "Google Play";

/// Configuration for [`GoogleVerifier`].
#[derive(Clone)]
pub struct GoogleConfig {
    /// Path to a service-account JSON key file.
    pub credentials_path: Option<PathBuf>,
    /// Android application id, e.g. `com.liftlog.app`.
    pub package_name: Option<String>,
    pub api_base_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            package_name: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

/// The subset of a `SubscriptionPurchase` resource this verifier reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionPurchase {
    payment_state: Option<i64>,
    cancel_reason: Option<i64>,
    obfuscated_external_account_id: Option<String>,
}

impl SubscriptionPurchase {
    /// A missing payment state counts as pending.
    fn is_active(&self) -> bool {
        self.payment_state == Some(PAYMENT_RECEIVED) && self.cancel_reason.is_none()
    }
}

/// Everything needed to call the API. Absent when unconfigured.
struct PublisherClient {
    auth: ServiceAccountAuth,
    package_name: String,
}

/// Verifies Google Play subscription tokens.
pub struct GoogleVerifier {
    client: reqwest::Client,
    api_base_url: String,
    publisher: Option<PublisherClient>,
}

impl GoogleVerifier {
    /// Build the verifier, loading the service-account key eagerly.
    ///
    /// A missing or unreadable key leaves the verifier unconfigured rather
    /// than failing startup.
    pub fn new(client: reqwest::Client, config: GoogleConfig) -> Self {
        let publisher = match (config.credentials_path, config.package_name) {
            (Some(path), Some(package_name)) if !package_name.is_empty() => {
                match ServiceAccountKey::from_file(&path)
                    .and_then(|key| ServiceAccountAuth::new(client.clone(), key))
                {
                    Ok(auth) => {
                        tracing::info!(
                            client_email = %auth.client_email(),
                            package_name = %package_name,
                            "Google Play verification enabled"
                        );
                        Some(PublisherClient { auth, package_name })
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to initialize Google Play service");
                        None
                    }
                }
            }
            _ => None,
        };

        Self {
            client,
            api_base_url: config.api_base_url,
            publisher,
        }
    }

    async fn lookup(
        &self,
        publisher: &PublisherClient,
        product_id: &str,
        purchase_token: &str,
    ) -> Result<VerificationResult, VerificationError> {
        let url = endpoint_url(
            &self.api_base_url,
            &[
                "androidpublisher",
                "v3",
                "applications",
                &publisher.package_name,
                "purchases",
                "subscriptions",
                product_id,
                "tokens",
                purchase_token,
            ],
        )?;
        let access_token = publisher.auth.access_token().await?;

        let response = self.client.get(url).bearer_auth(access_token).send().await?;
        let response = VerificationError::ensure_success(response).await?;
        let purchase: SubscriptionPurchase = VerificationError::parse_json(response).await?;

        let subject_id = purchase.obfuscated_external_account_id.clone();
        if purchase.is_active() {
            Ok(VerificationResult::valid(Platform::Google, subject_id))
        } else {
            Ok(VerificationResult::invalid(Platform::Google, SUBSCRIPTION_NOT_ACTIVE).with_subject(subject_id))
        }
    }
}

#[async_trait]
impl VerificationStrategy for GoogleVerifier {
    fn platform(&self) -> Platform {
        Platform::Google
    }

    async fn verify(&self, token: &str) -> VerificationResult {
        let Some(publisher) = self.publisher.as_ref() else {
            tracing::warn!("Google Play verification not configured");
            return VerificationResult::invalid(Platform::Google, NOT_CONFIGURED);
        };

        let Some((product_id, purchase_token)) = token
            .split_once(':')
            .filter(|(product_id, purchase_token)| !product_id.is_empty() && !purchase_token.is_empty())
        else {
            return VerificationResult::invalid(Platform::Google, INVALID_TOKEN_FORMAT);
        };

        recover(
            Platform::Google,
            LABEL,
            self.lookup(publisher, product_id, purchase_token).await,
        )
    }
}
