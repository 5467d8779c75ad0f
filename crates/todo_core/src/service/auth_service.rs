//! Account use-case service.
//!
//! # Responsibility
//! - Registration, login/logout and session resolution.
//! - Password reset through single-use, time-limited tokens.
//!
//! # Invariants
//! - Only SHA-256 digests are handed to the repository.
//! - Login failures do not reveal whether the identifier exists.
//! - Logs carry user ids only, never identifiers, passwords or tokens.

use crate::auth::{generate_reset_token, hash_password, hash_reset_token, verify_password};
use crate::model::user::{check_new_password, parse_email, NewUser, Session, User, UserId};
use crate::model::validation::ValidationError;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Lifetime of a password reset token.
pub const RESET_TOKEN_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Service error for account use-cases.
#[derive(Debug)]
pub enum AuthError {
    Validation(ValidationError),
    UsernameTaken,
    EmailTaken,
    InvalidCredentials,
    UnknownEmail,
    /// Token is unknown, already used, or expired.
    InvalidResetToken,
    Repo(RepoError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UsernameTaken => write!(f, "username already exists"),
            Self::EmailTaken => write!(f, "email already registered"),
            Self::InvalidCredentials => write!(f, "invalid username/email or password"),
            Self::UnknownEmail => write!(f, "no account found with that email address"),
            Self::InvalidResetToken => write!(f, "invalid or expired reset token"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for AuthError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Conflict("username") => Self::UsernameTaken,
            RepoError::Conflict("email") => Self::EmailTaken,
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Successful login: the account plus its new session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
    pub user: User,
    pub session: Session,
}

/// Issued reset token. The plain token is only ever returned here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordResetTicket {
    pub user_id: UserId,
    pub token: String,
    /// Unix epoch milliseconds.
    pub expires_at: i64,
}

/// Account service facade over a user repository.
pub struct AuthService<R: UserRepository> {
    repo: R,
    clock: fn() -> i64,
}

impl<R: UserRepository> AuthService<R> {
    /// Creates a service using wall-clock time.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, now_epoch_ms)
    }

    /// Creates a service with a custom epoch-millisecond clock.
    pub fn with_clock(repo: R, clock: fn() -> i64) -> Self {
        Self { repo, clock }
    }

    /// Registers a new account.
    ///
    /// # Errors
    /// - `Validation` for malformed fields or mismatched confirmation.
    /// - `UsernameTaken` / `EmailTaken` when the identity already exists.
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, AuthError> {
        let new_user = NewUser::parse(username, email, password, confirm_password)?;
        let digest = hash_password(&new_user.password);
        match self.repo.create_user(&new_user, &digest) {
            Ok(user) => {
                info!(
                    "event=user_register module=auth status=ok user_id={}",
                    user.id
                );
                Ok(user)
            }
            Err(err) => {
                let err = AuthError::from(err);
                warn!(
                    "event=user_register module=auth status=error error_code={}",
                    error_code(&err)
                );
                Err(err)
            }
        }
    }

    /// Verifies credentials (`identifier` is a username or email) and opens
    /// a session.
    pub fn login(&self, identifier: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if identifier.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let credentials = self.repo.find_credentials(identifier)?;
        let Some(credentials) =
            credentials.filter(|found| verify_password(password, &found.password_hash))
        else {
            warn!("event=user_login module=auth status=error error_code=invalid_credentials");
            return Err(AuthError::InvalidCredentials);
        };

        let session = self.repo.create_session(credentials.user.id)?;
        info!(
            "event=user_login module=auth status=ok user_id={}",
            credentials.user.id
        );
        Ok(LoginOutcome {
            user: credentials.user,
            session,
        })
    }

    /// Ends a session. Unknown tokens are not an error.
    pub fn logout(&self, token: Uuid) -> Result<bool, AuthError> {
        let removed = self.repo.delete_session(token)?;
        info!("event=user_logout module=auth status=ok removed={removed}");
        Ok(removed)
    }

    /// Resolves a session token to its account, if the session still exists.
    pub fn current_user(&self, token: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.repo.session_user(token)?)
    }

    /// Issues a reset token for the account registered under `email`.
    pub fn request_password_reset(&self, email: &str) -> Result<PasswordResetTicket, AuthError> {
        let email = parse_email(email)?;
        let user = self
            .repo
            .find_by_email(&email)?
            .ok_or(AuthError::UnknownEmail)?;

        let token = generate_reset_token();
        let expires_at = (self.clock)() + RESET_TOKEN_TTL_MS;
        self.repo
            .create_reset_token(user.id, &hash_reset_token(&token), expires_at)?;

        info!(
            "event=password_reset_request module=auth status=ok user_id={}",
            user.id
        );
        Ok(PasswordResetTicket {
            user_id: user.id,
            token,
            expires_at,
        })
    }

    /// Replaces the password of the token's owner and revokes its sessions.
    pub fn reset_password(
        &mut self,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<UserId, AuthError> {
        check_new_password(new_password, confirm_password)?;
        if token.trim().is_empty() {
            return Err(AuthError::InvalidResetToken);
        }

        let now = (self.clock)();
        let user_id = self
            .repo
            .consume_reset_token(&hash_reset_token(token), now, &hash_password(new_password))?
            .ok_or_else(|| {
                warn!("event=password_reset module=auth status=error error_code=invalid_token");
                AuthError::InvalidResetToken
            })?;

        info!("event=password_reset module=auth status=ok user_id={user_id}");
        Ok(user_id)
    }
}

fn error_code(err: &AuthError) -> &'static str {
    match err {
        AuthError::Validation(_) => "validation",
        AuthError::UsernameTaken => "username_taken",
        AuthError::EmailTaken => "email_taken",
        AuthError::InvalidCredentials => "invalid_credentials",
        AuthError::UnknownEmail => "unknown_email",
        AuthError::InvalidResetToken => "invalid_token",
        AuthError::Repo(_) => "repo",
    }
}

fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
