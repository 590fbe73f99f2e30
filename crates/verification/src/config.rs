use std::time::Duration;

use crate::apple::AppleConfig;
use crate::google::GoogleConfig;
use crate::revenuecat::RevenueCatConfig;
use crate::web::WebConfig;

/// Default timeout for a single outbound verification request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for every verification strategy.
///
/// A strategy whose credentials are absent stays registered but reports
/// "not configured" for every token.
#[derive(Clone)]
pub struct VerificationConfig {
    /// Per-request timeout applied by the shared HTTP client.
    pub timeout: Duration,
    pub web: WebConfig,
    pub google: GoogleConfig,
    pub apple: AppleConfig,
    pub revenuecat: RevenueCatConfig,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            web: WebConfig::default(),
            google: GoogleConfig::default(),
            apple: AppleConfig::default(),
            revenuecat: RevenueCatConfig::default(),
        }
    }
}

impl VerificationConfig {
    /// Load verification configuration from environment variables.
    ///
    /// | Env Var                          | Default  |
    /// |----------------------------------|----------|
    /// | `VERIFICATION_TIMEOUT_SECS`      | `30`     |
    /// | `WEB_AUTH_SECRET_KEY`            | --       |
    /// | `GOOGLE_APPLICATION_CREDENTIALS` | --       |
    /// | `GOOGLE_PACKAGE_NAME`            | --       |
    /// | `APPLE_SHARED_SECRET`            | --       |
    /// | `REVENUECAT_API_KEY`             | --       |
    ///
    /// Endpoint URLs are not read from the environment; they always point at
    /// the platforms' production hosts.
    pub fn from_env() -> Self {
        let timeout_secs: u64 = std::env::var("VERIFICATION_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_SECS.to_string())
            .parse()
            .expect("VERIFICATION_TIMEOUT_SECS must be a valid u64");

        Self {
            timeout: Duration::from_secs(timeout_secs),
            web: WebConfig {
                secret_key: optional_var("WEB_AUTH_SECRET_KEY"),
            },
            google: GoogleConfig {
                credentials_path: optional_var("GOOGLE_APPLICATION_CREDENTIALS").map(Into::into),
                package_name: optional_var("GOOGLE_PACKAGE_NAME"),
                ..GoogleConfig::default()
            },
            apple: AppleConfig {
                shared_secret: optional_var("APPLE_SHARED_SECRET"),
                ..AppleConfig::default()
            },
            revenuecat: RevenueCatConfig {
                api_key: optional_var("REVENUECAT_API_KEY"),
                ..RevenueCatConfig::default()
            },
        }
    }

    /// Build the HTTP client shared by all strategies.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.timeout).build()
    }
}

/// Read an env var, treating unset and empty the same.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
