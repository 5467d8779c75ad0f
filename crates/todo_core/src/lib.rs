//! Core domain logic for the todo manager.
//! This crate is the single source of truth for account and task invariants.

pub mod auth;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{
    DueStatus, Priority, Recurrence, Task, TaskDraft, TaskId, UnknownVariant, DEFAULT_CATEGORIES,
};
pub use model::user::{Session, User, UserId};
pub use model::validation::ValidationError;
pub use repo::task_repo::{
    CompletionOutcome, SqliteTaskRepository, TaskListQuery, TaskRepository, TaskSort,
};
pub use repo::user_repo::{SqliteUserRepository, UserCredentials, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::auth_service::{
    AuthError, AuthService, LoginOutcome, PasswordResetTicket, RESET_TOKEN_TTL_MS,
};
pub use service::calendar::{CalendarDay, CalendarMonth};
pub use service::task_service::{
    next_occurrence_draft, CompletedTask, TaskService, TaskServiceError, TaskServiceResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
