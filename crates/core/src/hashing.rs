//! Token hashing for rate-limit bucket keys.
//!
//! Raw purchase tokens are never persisted. The consumption store is keyed
//! by the SHA-256 hex digest of the token instead. The digest is unsalted so
//! the same token maps to the same bucket across restarts; it is a lookup
//! key, not a password hash.

use sha2::{Digest, Sha256};

/// Length of a SHA-256 hex digest.
pub const DIGEST_HEX_LENGTH: usize = 64;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Hash a raw purchase token into its storage key.
pub fn hash_token(raw_token: &str) -> String {
    sha256_hex(raw_token.as_bytes())
}
