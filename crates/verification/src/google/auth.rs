//! Service-account OAuth for the Android Publisher API.
//!
//! A signed RS256 assertion is exchanged at the key's `token_uri` for a
//! short-lived bearer token, which is cached until shortly before it expires.

use std::path::Path;

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use liftlog_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::VerificationError;

/// OAuth scope for subscription lookups.
pub const ANDROID_PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (Google caps this at one hour).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Cached tokens are refreshed this long before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a service-account JSON key file this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Read and parse a service-account key file.
    pub fn from_file(path: &Path) -> Result<Self, VerificationError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VerificationError::Auth(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| VerificationError::Auth(format!("{}: {e}", path.display())))
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Timestamp,
}

/// Issues and caches access tokens for one service account.
pub struct ServiceAccountAuth {
    client: reqwest::Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Fails if the key's private key is not a valid RSA PEM.
    pub fn new(client: reqwest::Client, key: ServiceAccountKey) -> Result<Self, VerificationError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| VerificationError::Auth(format!("Invalid service account private key: {e}")))?;

        Ok(Self {
            client,
            key,
            encoding_key,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Return a bearer token, exchanging a fresh assertion when the cached
    /// one is missing or about to expire.
    ///
    /// The cache lock is not held across the exchange, so a slow token
    /// endpoint delays concurrent callers by one timeout, not one each.
    pub async fn access_token(&self) -> Result<String, VerificationError> {
        let now = Utc::now();
        if let Some(access_token) = self.cached_token(now).await {
            return Ok(access_token);
        }

        let token = self.exchange(now).await?;
        let access_token = token.access_token.clone();
        *self.cached.lock().await = Some(token);
        Ok(access_token)
    }

    async fn cached_token(&self, now: Timestamp) -> Option<String> {
        let cached = self.cached.lock().await;
        cached
            .as_ref()
            .filter(|token| token.expires_at - TimeDelta::seconds(REFRESH_MARGIN_SECS) > now)
            .map(|token| token.access_token.clone())
    }

    async fn exchange(&self, now: Timestamp) -> Result<CachedToken, VerificationError> {
        let assertion = self.assertion(now)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let response = VerificationError::ensure_success(response)
            .await
            .map_err(|e| VerificationError::Auth(format!("Token exchange rejected: {e}")))?;
        let body: TokenResponse = VerificationError::parse_json(response).await?;

        tracing::debug!(client_email = %self.key.client_email, expires_in = body.expires_in, "Obtained Google access token");

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: now + TimeDelta::seconds(body.expires_in),
        })
    }

    fn assertion(&self, now: Timestamp) -> Result<String, VerificationError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: ANDROID_PUBLISHER_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| VerificationError::Auth(format!("Failed to sign assertion: {e}")))
    }
}
