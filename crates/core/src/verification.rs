//! Outcome of verifying a purchase token against its platform.

use serde::Serialize;

use crate::platform::Platform;

/// Result of a single verification call.
///
/// Every failure mode a caller can trigger (bad token format, missing
/// configuration, remote rejection, transport failure) is expressed as
/// `valid == false` with an `error_detail`; verifiers never return errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub valid: bool,
    pub platform: Platform,
    /// Platform-reported identity behind the token. Opaque to the limiter.
    pub subject_id: Option<String>,
    pub error_detail: Option<String>,
}

impl VerificationResult {
    /// A successful verification.
    pub fn valid(platform: Platform, subject_id: Option<String>) -> Self {
        Self {
            valid: true,
            platform,
            subject_id,
            error_detail: None,
        }
    }

    /// A failed verification carrying a diagnostic message.
    pub fn invalid(platform: Platform, detail: impl Into<String>) -> Self {
        Self {
            valid: false,
            platform,
            subject_id: None,
            error_detail: Some(detail.into()),
        }
    }

    /// Attach the platform-reported subject to a result.
    pub fn with_subject(mut self, subject_id: Option<String>) -> Self {
        self.subject_id = subject_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_result_has_detail_and_no_subject() {
        let result = VerificationResult::invalid(Platform::Apple, "Apple verification not configured");
        assert!(!result.valid);
        assert_eq!(result.platform, Platform::Apple);
        assert!(result.subject_id.is_none());
        assert_eq!(
            result.error_detail.as_deref(),
            Some("Apple verification not configured")
        );
    }

    #[test]
    fn with_subject_keeps_validity() {
        let result = VerificationResult::invalid(Platform::Google, "Subscription is not active")
            .with_subject(Some("acct-1".into()));
        assert!(!result.valid);
        assert_eq!(result.subject_id.as_deref(), Some("acct-1"));
    }
}
