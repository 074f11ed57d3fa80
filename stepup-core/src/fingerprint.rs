//! Best-effort device fingerprint.
//!
//! The fingerprint is a hint the backend folds into its trust decision,
//! never an authorization boundary on its own. It must be stable across
//! sessions on the same machine and must always produce a non-empty
//! string, even when every ambient signal is missing.

use sha3::{Digest, Sha3_256};

/// Environment variables sampled into the fingerprint. Reads only;
/// nothing here touches the network or durable storage.
const ENV_SIGNALS: &[&str] = &["HOSTNAME", "USER", "LANG", "HOME"];

/// Derive an opaque, deterministic identifier for this device/profile.
pub fn generate_fingerprint() -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(std::env::consts::OS.as_bytes());
    hasher.update(std::env::consts::ARCH.as_bytes());

    for key in ENV_SIGNALS {
        // Missing variables still contribute their name, so the digest
        // stays stable for a profile where they are consistently unset.
        hasher.update(key.as_bytes());
        if let Ok(value) = std::env::var(key) {
            hasher.update(value.as_bytes());
        }
    }

    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_non_empty() {
        assert!(!generate_fingerprint().is_empty());
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = generate_fingerprint();
        let b = generate_fingerprint();
        assert_eq!(a, b, "Same runtime should produce the same fingerprint");
    }

    #[test]
    fn test_fingerprint_is_hex_digest() {
        let fp = generate_fingerprint();
        assert_eq!(fp.len(), 64, "SHA3-256 hex digest is 64 characters");
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
