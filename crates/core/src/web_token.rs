//! HMAC-SHA256 signed web access tokens.
//!
//! Token format: `{subject_id}.{timestamp}.{signature}` where `signature` is
//! the lowercase hex HMAC-SHA256 of `{subject_id}.{timestamp}` keyed by the
//! server's web auth secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Why a web token failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebTokenError {
    #[error("Invalid token format")]
    Malformed,

    #[error("Invalid signature")]
    InvalidSignature,
}

/// Compute the hex signature for a subject and timestamp.
pub fn sign(secret: &str, subject_id: &str, timestamp: &str) -> String {
    let mac = mac_for(secret, subject_id, timestamp);
    hex::encode(mac.finalize().into_bytes())
}

/// Build a complete signed token.
pub fn issue(secret: &str, subject_id: &str, timestamp: &str) -> String {
    let signature = sign(secret, subject_id, timestamp);
    format!("{subject_id}.{timestamp}.{signature}")
}

/// Verify a token and return its embedded subject on success.
///
/// The signature comparison is constant-time. Anything other than exactly
/// three segments is [`WebTokenError::Malformed`]; a signature that is not
/// lowercase hex cannot match and is [`WebTokenError::InvalidSignature`].
pub fn verify<'a>(secret: &str, token: &'a str) -> Result<&'a str, WebTokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    let &[subject_id, timestamp, signature] = parts.as_slice() else {
        return Err(WebTokenError::Malformed);
    };

    let provided = hex::decode(signature).ok_or(WebTokenError::InvalidSignature)?;
    mac_for(secret, subject_id, timestamp)
        .verify_slice(&provided)
        .map_err(|_| WebTokenError::InvalidSignature)?;

    Ok(subject_id)
}

fn mac_for(secret: &str, subject_id: &str, timestamp: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(subject_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac
}

// ---------------------------------------------------------------------------
// hex helpers (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a strictly lowercase hex string. Returns `None` on odd length
    /// or any character outside `[0-9a-f]`.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        s.as_bytes()
            .chunks(2)
            .map(|pair| Some(nibble(pair[0])? << 4 | nibble(pair[1])?))
            .collect()
    }

    fn nibble(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            _ => None,
        }
    }
}
