//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into register/login and task use-cases.
//! - Keep the CLI decoupled from storage details.

pub mod auth_service;
pub mod calendar;
pub mod task_service;
