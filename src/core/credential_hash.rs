//! Credential fingerprints for logs and diagnostics.
//!
//! Raw bearer tokens and API keys never reach a log line. Where a credential
//! has to be identifiable (for example to tell two sessions apart), its
//! short SHA-256 fingerprint is logged instead.

use sha2::{Digest, Sha256};

/// Hex characters kept from the digest.
const FINGERPRINT_LEN: usize = 12;

/// Short, stable, non-reversible identifier for a secret.
#[must_use]
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}

/// Fingerprint rendered for display, e.g. `sha256:1a2b3c4d5e6f`.
#[must_use]
pub fn display_fingerprint(secret: &str) -> String {
    if secret.is_empty() {
        return "<empty>".to_string();
    }
    format!("sha256:{}", fingerprint(secret))
}
