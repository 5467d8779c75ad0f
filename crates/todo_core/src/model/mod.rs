//! Domain model for users and their tasks.
//!
//! # Responsibility
//! - Define canonical records shared by repositories, services and the CLI.
//! - Own field-level validation and normalization rules.
//!
//! # Invariants
//! - Every task is owned by exactly one `UserId`.
//! - Password material never appears on `User`; only the repository layer
//!   sees digests.

pub mod task;
pub mod user;
pub mod validation;
