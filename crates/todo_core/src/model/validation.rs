//! Field validation errors shared by the user and task models.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejection reason for user or task input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is empty after trimming.
    EmptyField(&'static str),
    /// Field exceeds its maximum length in characters.
    TooLong { field: &'static str, max: usize },
    InvalidUsername(String),
    InvalidEmail(String),
    PasswordTooShort { min: usize },
    PasswordMismatch,
    /// A tag value is blank after trimming.
    BlankTag,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} must not be empty"),
            Self::TooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Self::InvalidUsername(value) => write!(
                f,
                "invalid username `{value}`: use 3-32 letters, digits, `_`, `.` or `-`"
            ),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::PasswordTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
            Self::PasswordMismatch => write!(f, "passwords do not match"),
            Self::BlankTag => write!(f, "tags must not be blank"),
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and enforces non-empty + max length.
pub(crate) fn required_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}
