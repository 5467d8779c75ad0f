//! User, session and password-reset repository.
//!
//! # Responsibility
//! - Persist accounts with their password digest.
//! - Track login sessions and single-use reset tokens.
//!
//! # Invariants
//! - Username and email uniqueness is enforced by the schema and surfaced
//!   as `RepoError::Conflict`.
//! - A reset token is consumed in the same transaction that replaces the
//!   password digest; consuming also revokes the user's sessions.

use crate::model::user::{NewUser, Session, User, UserId};
use crate::repo::{
    bool_to_int, ensure_tables, map_unique_violation, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    email,
    password_hash,
    created_at
FROM users";

const USER_UNIQUE_COLUMNS: &[(&str, &str)] =
    &[("users.username", "username"), ("users.email", "email")];

/// Account row including its stored password digest.
///
/// Only services that verify or replace credentials should see this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Repository interface for accounts and their sessions.
pub trait UserRepository {
    /// Inserts a new account storing `password_hash` (never the password).
    fn create_user(&self, new_user: &NewUser, password_hash: &str) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Looks up by username or email, case-insensitively.
    fn find_credentials(&self, identifier: &str) -> RepoResult<Option<UserCredentials>>;
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    fn create_session(&self, user_id: UserId) -> RepoResult<Session>;
    fn session_user(&self, token: Uuid) -> RepoResult<Option<User>>;
    /// Returns whether a session row was removed.
    fn delete_session(&self, token: Uuid) -> RepoResult<bool>;
    fn create_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at_ms: i64,
    ) -> RepoResult<()>;
    /// Atomically validates an unused, unexpired reset token, replaces the
    /// owner's password digest, marks the token used and drops sessions.
    ///
    /// Returns the affected user, or `None` when the token is unusable.
    fn consume_reset_token(
        &mut self,
        token_hash: &str,
        now_ms: i64,
        new_password_hash: &str,
    ) -> RepoResult<Option<UserId>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["users", "sessions", "password_reset_tokens"])?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, new_user: &NewUser, password_hash: &str) -> RepoResult<User> {
        self.conn
            .execute(
                "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3);",
                params![
                    new_user.username.as_str(),
                    new_user.email.as_str(),
                    password_hash
                ],
            )
            .map_err(|err| map_unique_violation(err, USER_UNIQUE_COLUMNS))?;

        let id = self.conn.last_insert_rowid();
        self.get_user(id)?.ok_or(RepoError::NotFound {
            entity: "user",
            id,
        })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_credentials_row,
            )
            .optional()?;
        Ok(row.map(|credentials| credentials.user))
    }

    fn find_credentials(&self, identifier: &str) -> RepoResult<Option<UserCredentials>> {
        let identifier = identifier.trim();
        let row = self
            .conn
            .query_row(
                &format!(
                    "{USER_SELECT_SQL}
                     WHERE username = ?1 COLLATE NOCASE
                        OR email = ?1 COLLATE NOCASE
                     ORDER BY id ASC
                     LIMIT 1;"
                ),
                [identifier],
                parse_credentials_row,
            )
            .optional()?;
        Ok(row)
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE email = ?1 COLLATE NOCASE;"),
                [email.trim()],
                parse_credentials_row,
            )
            .optional()?;
        Ok(row.map(|credentials| credentials.user))
    }

    fn create_session(&self, user_id: UserId) -> RepoResult<Session> {
        let token = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO sessions (token, user_id) VALUES (?1, ?2);",
            params![token.to_string(), user_id],
        )?;
        let created_at: i64 = self.conn.query_row(
            "SELECT created_at FROM sessions WHERE token = ?1;",
            [token.to_string()],
            |row| row.get(0),
        )?;
        Ok(Session {
            token,
            user_id,
            created_at,
        })
    }

    fn session_user(&self, token: Uuid) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT u.id, u.username, u.email, u.password_hash, u.created_at
                 FROM sessions s
                 INNER JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1;",
                [token.to_string()],
                parse_credentials_row,
            )
            .optional()?;
        Ok(row.map(|credentials| credentials.user))
    }

    fn delete_session(&self, token: Uuid) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM sessions WHERE token = ?1;",
            [token.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn create_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at_ms: i64,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
             VALUES (?1, ?2, ?3);",
            params![user_id, token_hash, expires_at_ms],
        )?;
        Ok(())
    }

    fn consume_reset_token(
        &mut self,
        token_hash: &str,
        now_ms: i64,
        new_password_hash: &str,
    ) -> RepoResult<Option<UserId>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let user_id: Option<UserId> = tx
            .query_row(
                "SELECT user_id
                 FROM password_reset_tokens
                 WHERE token_hash = ?1
                   AND used = ?2
                   AND expires_at > ?3;",
                params![token_hash, bool_to_int(false), now_ms],
                |row| row.get(0),
            )
            .optional()?;

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE users SET password_hash = ?1 WHERE id = ?2;",
            params![new_password_hash, user_id],
        )?;
        tx.execute(
            "UPDATE password_reset_tokens SET used = ?1 WHERE token_hash = ?2;",
            params![bool_to_int(true), token_hash],
        )?;
        tx.execute("DELETE FROM sessions WHERE user_id = ?1;", [user_id])?;
        tx.commit()?;

        Ok(Some(user_id))
    }
}

fn parse_credentials_row(row: &Row<'_>) -> rusqlite::Result<UserCredentials> {
    Ok(UserCredentials {
        user: User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(4)?,
        },
        password_hash: row.get(3)?,
    })
}
