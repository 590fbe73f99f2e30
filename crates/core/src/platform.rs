//! Purchase platforms a token can originate from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The origin of a purchase or access token.
///
/// The string forms (`"Web"`, `"Google"`, `"Apple"`, `"RevenueCat"`) are what
/// clients send in the `Authorization` header and what the consumption store
/// persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Web,
    Google,
    Apple,
    RevenueCat,
}

impl Platform {
    /// Every supported platform.
    pub const ALL: [Platform; 4] = [
        Platform::Web,
        Platform::Google,
        Platform::Apple,
        Platform::RevenueCat,
    ];

    /// The canonical string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Web => "Web",
            Platform::Google => "Google",
            Platform::Apple => "Apple",
            Platform::RevenueCat => "RevenueCat",
        }
    }

    /// Whether the platform is a mobile store (shares the mobile quota).
    pub fn is_mobile(self) -> bool {
        !matches!(self, Platform::Web)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid platform: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_form_round_trips_for_every_platform() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("web".parse::<Platform>().is_err());
        assert!("REVENUECAT".parse::<Platform>().is_err());
    }

    #[test]
    fn unknown_literal_is_rejected() {
        let err = "Steam".parse::<Platform>().unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: Invalid platform: Steam");
    }

    #[test]
    fn only_web_is_not_mobile() {
        assert!(!Platform::Web.is_mobile());
        assert!(Platform::Google.is_mobile());
        assert!(Platform::Apple.is_mobile());
        assert!(Platform::RevenueCat.is_mobile());
    }

    #[test]
    fn serializes_as_string_form() {
        let json = serde_json::to_string(&Platform::RevenueCat).unwrap();
        assert_eq!(json, "\"RevenueCat\"");
    }
}
