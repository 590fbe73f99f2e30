//! Platform dispatch over the registered strategies.

use std::collections::HashMap;
use std::sync::Arc;

use liftlog_core::platform::Platform;
use liftlog_core::verification::VerificationResult;

use crate::apple::AppleVerifier;
use crate::config::VerificationConfig;
use crate::google::GoogleVerifier;
use crate::revenuecat::RevenueCatVerifier;
use crate::strategy::VerificationStrategy;
use crate::web::WebVerifier;

/// Routes each token to the strategy registered for its platform.
///
/// Built once at startup and shared behind an `Arc`; strategies hold no
/// per-request state.
#[derive(Clone, Default)]
pub struct PurchaseVerifier {
    strategies: HashMap<Platform, Arc<dyn VerificationStrategy>>,
}

impl PurchaseVerifier {
    /// An empty verifier; every platform is unregistered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under the platform it reports, replacing any
    /// previous registration.
    pub fn register(mut self, strategy: Arc<dyn VerificationStrategy>) -> Self {
        self.strategies.insert(strategy.platform(), strategy);
        self
    }

    /// Register all four platform strategies, sharing one HTTP client.
    pub fn from_config(config: VerificationConfig) -> Result<Self, reqwest::Error> {
        let client = config.http_client()?;

        Ok(Self::new()
            .register(Arc::new(WebVerifier::new(config.web)))
            .register(Arc::new(GoogleVerifier::new(client.clone(), config.google)))
            .register(Arc::new(AppleVerifier::new(client.clone(), config.apple)))
            .register(Arc::new(RevenueCatVerifier::new(client, config.revenuecat))))
    }

    pub fn is_registered(&self, platform: Platform) -> bool {
        self.strategies.contains_key(&platform)
    }

    /// Verify a token against its platform. Never fails.
    pub async fn verify(&self, platform: Platform, token: &str) -> VerificationResult {
        match self.strategies.get(&platform) {
            Some(strategy) => strategy.verify(token).await,
            None => {
                tracing::warn!(%platform, "No verification service for platform");
                VerificationResult::invalid(platform, format!("No service configured for {platform}"))
            }
        }
    }

    pub async fn is_valid(&self, platform: Platform, token: &str) -> bool {
        self.verify(platform, token).await.valid
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct Fixed(Platform, bool);

    #[async_trait]
    impl VerificationStrategy for Fixed {
        fn platform(&self) -> Platform {
            self.0
        }

        async fn verify(&self, token: &str) -> VerificationResult {
            if self.1 {
                VerificationResult::valid(self.0, Some(token.to_string()))
            } else {
                VerificationResult::invalid(self.0, "rejected")
            }
        }
    }

    #[tokio::test]
    async fn unregistered_platform_is_invalid() {
        let verifier = PurchaseVerifier::new().register(Arc::new(Fixed(Platform::Web, true)));

        let result = verifier.verify(Platform::Apple, "receipt").await;
        assert!(!result.valid);
        assert_eq!(result.platform, Platform::Apple);
        assert_eq!(
            result.error_detail.as_deref(),
            Some("No service configured for Apple")
        );
    }

    #[tokio::test]
    async fn dispatches_by_platform() {
        let verifier = PurchaseVerifier::new()
            .register(Arc::new(Fixed(Platform::Web, true)))
            .register(Arc::new(Fixed(Platform::Google, false)));

        assert!(verifier.is_valid(Platform::Web, "t").await);
        assert!(!verifier.is_valid(Platform::Google, "t").await);

        let result = verifier.verify(Platform::Web, "subject").await;
        assert_eq!(result.subject_id.as_deref(), Some("subject"));
    }

    #[tokio::test]
    async fn later_registration_replaces_earlier() {
        let verifier = PurchaseVerifier::new()
            .register(Arc::new(Fixed(Platform::Web, false)))
            .register(Arc::new(Fixed(Platform::Web, true)));

        assert!(verifier.is_valid(Platform::Web, "t").await);
    }

    #[test]
    fn from_config_registers_every_platform() {
        let verifier = PurchaseVerifier::from_config(VerificationConfig::default()).unwrap();
        for platform in Platform::ALL {
            assert!(verifier.is_registered(platform));
        }
    }
}
