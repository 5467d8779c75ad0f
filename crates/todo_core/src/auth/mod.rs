//! Credential primitives.
//!
//! # Responsibility
//! - Digest passwords and reset tokens with SHA-256.
//! - Generate unguessable password-reset tokens.
//!
//! # Invariants
//! - Plain-text passwords and tokens never leave this module in stored form;
//!   callers persist only the hex digests.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{generate_reset_token, hash_reset_token};
