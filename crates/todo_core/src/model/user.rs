//! User domain model and registration input rules.
//!
//! # Invariants
//! - `username` and `email` are unique (case-insensitive) across the store.
//! - `User` carries no password material.

use crate::model::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row id of a registered user.
pub type UserId = i64;

pub const PASSWORD_MIN_CHARS: usize = 6;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,32}$").expect("valid username regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("valid email regex")
});

/// Registered account as seen by services and callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Logged-in session handle. The token is the only thing a client keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Uuid,
    pub user_id: UserId,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Validated registration input. Password is still plain text here and
/// must be digested before it reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// Trims identity fields and checks every registration rule.
    pub fn parse(
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Self, ValidationError> {
        let username = parse_username(username)?;
        let email = parse_email(email)?;
        check_new_password(password, confirm_password)?;
        Ok(Self {
            username,
            email,
            password: password.to_string(),
        })
    }
}

pub fn parse_username(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username"));
    }
    if !USERNAME_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidUsername(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

pub fn parse_email(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }
    if !EMAIL_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidEmail(trimmed.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// Password rules shared by registration and password reset.
pub fn check_new_password(password: &str, confirm_password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ValidationError::PasswordTooShort {
            min: PASSWORD_MIN_CHARS,
        });
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}
