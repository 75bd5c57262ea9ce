//! Credential and token helpers
//!
//! # Architecture
//!
//! - Passwords are stored as `sha256(salt + password)` hex digests with a
//!   per-admin random hex salt.
//! - Session and password-reset tokens are opaque random hex strings; the
//!   caller stores them with an expiry timestamp.
//!
//! This module contains ONLY pure functions. No HTTP framework or database
//! dependencies - those are in service-specific code.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Salt length in bytes (hex-encoded to twice this many characters)
const SALT_BYTES: usize = 16;

/// Token length in bytes (hex-encoded to twice this many characters)
const TOKEN_BYTES: usize = 32;

/// Password-reset tokens are valid for one hour
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Generate a random hex salt for a new password digest
pub fn generate_salt() -> String {
    random_hex(SALT_BYTES)
}

/// Generate an opaque session or reset token
pub fn generate_token() -> String {
    random_hex(TOKEN_BYTES)
}

/// Digest a password with the given salt
///
/// Returns 64 hex characters (SHA-256).
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check a password attempt against a stored salt and digest
pub fn verify_password(password: &str, salt: &str, digest: &str) -> bool {
    hash_password(password, salt) == digest
}

/// Expiry timestamp a given number of minutes from now
pub fn expiry_after(minutes: i64) -> DateTime<Utc> {
    Utc::now() + Duration::minutes(minutes)
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);

    let mut out = String::with_capacity(bytes * 2);
    for b in buf {
        // Writing to a String cannot fail
        let _ = write!(out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let salt = generate_salt();
        let digest = hash_password("correct horse", &salt);

        assert!(verify_password("correct horse", &salt, &digest));
        assert!(!verify_password("wrong horse", &salt, &digest));
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let digest = hash_password("password", "00ff");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_same_password_different_salt_differs() {
        let a = hash_password("password", &generate_salt());
        let b = hash_password("password", &generate_salt());
        assert_ne!(a, b);
    }

    #[test]
    fn test_tokens_are_opaque_and_distinct() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_expiry_is_in_the_future() {
        let expiry = expiry_after(30);
        assert!(expiry > Utc::now());
        assert!(expiry < Utc::now() + Duration::minutes(31));
    }
}
