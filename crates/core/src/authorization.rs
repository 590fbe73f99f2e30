//! Parsing of the purchase-token `Authorization` header.
//!
//! Accepted forms:
//!
//! ```text
//! Authorization: <Platform> <token>
//! Authorization: Bearer <Platform> <token>
//! ```
//!
//! The `Bearer` marker is matched case-insensitively; the platform literal
//! is matched exactly (see [`Platform::as_str`]).

use crate::error::CoreError;
use crate::platform::Platform;

/// Platform and raw token extracted from an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseCredentials {
    pub platform: Platform,
    pub token: String,
}

/// Parse an `Authorization` header value into purchase credentials.
pub fn parse_purchase_authorization(value: &str) -> Result<PurchaseCredentials, CoreError> {
    let mut parts: Vec<&str> = value.split_whitespace().collect();

    if parts
        .first()
        .is_some_and(|first| first.eq_ignore_ascii_case("bearer"))
    {
        parts.remove(0);
    }

    let &[platform, token] = parts.as_slice() else {
        return Err(CoreError::Unauthorized(
            "Invalid Authorization header format".into(),
        ));
    };

    let platform = platform
        .parse::<Platform>()
        .map_err(|_| CoreError::Unauthorized(format!("Invalid platform: {platform}")))?;

    Ok(PurchaseCredentials {
        platform,
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_platform_and_token() {
        let creds = parse_purchase_authorization("Google sub_monthly:abc123").unwrap();
        assert_eq!(creds.platform, Platform::Google);
        assert_eq!(creds.token, "sub_monthly:abc123");
    }

    #[test]
    fn strips_bearer_marker_case_insensitively() {
        for header in ["Bearer Web u.1.sig", "bearer Web u.1.sig", "BEARER Web u.1.sig"] {
            let creds = parse_purchase_authorization(header).unwrap();
            assert_eq!(creds.platform, Platform::Web);
            assert_eq!(creds.token, "u.1.sig");
        }
    }

    #[test]
    fn wrong_segment_count_is_rejected() {
        for header in ["", "Bearer", "Web", "Bearer Web", "Web a b", "Bearer Web a b"] {
            assert_matches!(
                parse_purchase_authorization(header),
                Err(CoreError::Unauthorized(msg)) if msg == "Invalid Authorization header format",
                "{header:?}"
            );
        }
    }

    #[test]
    fn unknown_platform_is_rejected() {
        assert_matches!(
            parse_purchase_authorization("Bearer Steam token"),
            Err(CoreError::Unauthorized(msg)) if msg == "Invalid platform: Steam"
        );
    }

    #[test]
    fn only_leading_bearer_is_stripped() {
        let creds = parse_purchase_authorization("RevenueCat bearer").unwrap();
        assert_eq!(creds.platform, Platform::RevenueCat);
        assert_eq!(creds.token, "bearer");
    }
}
