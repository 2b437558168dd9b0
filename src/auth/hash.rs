//! Salted SHA-256 password digests.
//!
//! The stored digest is `hex(SHA256(password ++ salt))`, where `salt` is the
//! hex string itself (not its decoded bytes). Rows written by earlier
//! deployments use the same layout, so existing credentials keep verifying.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Salt byte length before hex encoding (16 bytes = 32 hex chars).
pub const SALT_BYTES: usize = 16;

/// Hex length of a SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// A salt and the digest computed with it.
///
/// The two are only ever produced and stored together, so a hash can never be
/// persisted against a salt it was not computed with.
#[derive(Clone, PartialEq, Eq)]
pub struct SaltedHash {
    pub salt: String,
    pub hash: String,
}

impl std::fmt::Debug for SaltedHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaltedHash")
            .field("salt", &"<redacted>")
            .field("hash", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh random salt and hash `password` with it.
pub fn generate_salted_hash(password: &str) -> SaltedHash {
    let salt = generate_salt();
    let hash = hash_with_salt(password, &salt);
    SaltedHash { salt, hash }
}

/// Check `password` against a stored salt and digest.
pub fn verify(password: &str, salt: &str, expected_hash: &str) -> bool {
    let candidate = hash_with_salt(password, salt);
    digests_match(&candidate, expected_hash)
}

/// Deterministic digest of `password` under `salt`.
pub fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut h = Sha256::new();
    h.update(password.as_bytes());
    h.update(salt.as_bytes());
    hex::encode(h.finalize())
}

/// Generate a random salt (hex-encoded).
fn generate_salt() -> String {
    let bytes: [u8; SALT_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Compare hex digests without an early exit on the first differing byte.
/// Slices of unequal length compare unequal.
fn digests_match(candidate: &str, stored: &str) -> bool {
    candidate.as_bytes().ct_eq(stored.as_bytes()).into()
}
