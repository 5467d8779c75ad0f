//! Password-reset token generation.

use super::password::sha256_hex;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

const RESET_TOKEN_BYTES: usize = 32;

/// Returns a fresh URL-safe token carrying 256 bits of OS randomness.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Digest stored in place of the token itself.
pub fn hash_reset_token(token: &str) -> String {
    sha256_hex(token.trim().as_bytes())
}
