//! SHA-256 password digests.
//!
//! Digests are lowercase hex, 64 characters. Comparison runs over every byte
//! regardless of where the first mismatch is.

use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of the UTF-8 password.
pub fn hash_password(password: &str) -> String {
    sha256_hex(password.as_bytes())
}

/// Checks `password` against a stored hex digest.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    constant_time_eq(
        hash_password(password).as_bytes(),
        stored_hash.to_ascii_lowercase().as_bytes(),
    )
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
