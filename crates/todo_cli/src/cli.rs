//! Command-line surface.
//!
//! # Responsibility
//! - Declare global flags and subcommands for the `todo` binary.
//! - Parse shell lines with the same subcommand set.
//!
//! # Invariants
//! - Enumerated values (priority, recurrence, sort) parse case-insensitively.
//! - Dates are `YYYY-MM-DD`.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use todo_core::{Priority, Recurrence, TaskId, TaskSort};

#[derive(Debug, Parser)]
#[command(name = "todo")]
#[command(about = "Personal task manager backed by SQLite", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (TOML)
    #[arg(long, global = true, env = "TODO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file; overrides config and TODO_DB_PATH
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// trace|debug|info|warn|error; overrides config and TODO_LOG_LEVEL
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

/// One line typed into `todo shell`.
#[derive(Debug, Parser)]
#[command(name = "todo", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create an account
    Register(RegisterArgs),

    /// Log in with username or email
    Login(LoginArgs),

    /// End the current session
    Logout,

    /// Show the logged-in account
    Whoami,

    /// Issue a password reset token for an email address
    ResetRequest {
        #[arg(long)]
        email: String,
    },

    /// Set a new password with a reset token
    ResetPassword(ResetPasswordArgs),

    /// Add a task
    Add(AddArgs),

    /// Edit fields of a task; omitted fields keep their value
    Edit(EditArgs),

    /// Mark a task completed
    Done { id: TaskId },

    /// Mark a completed task open again
    Reopen { id: TaskId },

    /// Delete a task
    Delete {
        id: TaskId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show one task
    Show { id: TaskId },

    /// List tasks
    List(ListArgs),

    /// List known tags
    Tags,

    /// List categories (defaults plus the ones in use)
    Categories,

    /// Month calendar of due tasks; defaults to the current month
    Calendar {
        #[arg(long)]
        year: Option<i32>,

        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },

    /// Interactive prompt
    Shell {
        /// Use a throwaway in-memory database
        #[arg(long)]
        ephemeral: bool,
    },
}

impl Command {
    /// Stable subcommand name for log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::Login(_) => "login",
            Self::Logout => "logout",
            Self::Whoami => "whoami",
            Self::ResetRequest { .. } => "reset-request",
            Self::ResetPassword(_) => "reset-password",
            Self::Add(_) => "add",
            Self::Edit(_) => "edit",
            Self::Done { .. } => "done",
            Self::Reopen { .. } => "reopen",
            Self::Delete { .. } => "delete",
            Self::Show { .. } => "show",
            Self::List(_) => "list",
            Self::Tags => "tags",
            Self::Categories => "categories",
            Self::Calendar { .. } => "calendar",
            Self::Shell { .. } => "shell",
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct RegisterArgs {
    #[arg(short, long)]
    pub username: String,

    #[arg(short, long)]
    pub email: String,

    /// Prompted for when omitted
    #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Defaults to --password when that is given
    #[arg(long)]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// Username or email
    pub identifier: String,

    /// Prompted for when omitted
    #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ResetPasswordArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub token: String,

    /// Prompted for when omitted
    #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Defaults to --password when that is given
    #[arg(long)]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct AddArgs {
    pub title: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    #[arg(short, long)]
    pub category: Option<String>,

    #[arg(short, long, default_value_t = Priority::Medium)]
    pub priority: Priority,

    /// YYYY-MM-DD
    #[arg(long)]
    pub due: Option<NaiveDate>,

    /// Comma-separated
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    #[arg(short, long, default_value_t = Recurrence::None)]
    pub repeat: Recurrence,
}

#[derive(Debug, Clone, Args)]
pub struct EditArgs {
    pub id: TaskId,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(short, long)]
    pub category: Option<String>,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// YYYY-MM-DD
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<NaiveDate>,

    #[arg(long)]
    pub clear_due: bool,

    /// Replaces all tags; comma-separated
    #[arg(short, long, value_delimiter = ',', conflicts_with = "clear_tags")]
    pub tags: Option<Vec<String>>,

    #[arg(long)]
    pub clear_tags: bool,

    #[arg(short, long)]
    pub repeat: Option<Recurrence>,
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[arg(short, long)]
    pub category: Option<String>,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    /// Tasks carrying any of these tags; comma-separated
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Only open tasks
    #[arg(long)]
    pub open: bool,

    /// Substring of title, description or category
    #[arg(short, long)]
    pub search: Option<String>,

    /// Defaults to `default_sort` from the config
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,

    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Due,
    Priority,
    Created,
}

impl From<SortArg> for TaskSort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Due => TaskSort::DueDate,
            SortArg::Priority => TaskSort::Priority,
            SortArg::Created => TaskSort::Created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, ShellLine, SortArg};
    use chrono::NaiveDate;
    use clap::{CommandFactory, Parser};
    use todo_core::{Priority, Recurrence, TaskSort};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_parses_enums_dates_and_tags() {
        let cli = Cli::try_parse_from([
            "todo", "add", "Pay rent", "--priority", "HIGH", "--due", "2024-03-01", "--tags",
            "home,bills", "--repeat", "monthly",
        ])
        .unwrap();

        let Command::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.title, "Pay rent");
        assert_eq!(args.priority, Priority::High);
        assert_eq!(args.due, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(args.tags, vec!["home".to_string(), "bills".to_string()]);
        assert_eq!(args.repeat, Recurrence::Monthly);
        assert_eq!(args.category, None);
    }

    #[test]
    fn add_rejects_malformed_due_date_and_unknown_priority() {
        assert!(Cli::try_parse_from(["todo", "add", "x", "--due", "03/01/2024"]).is_err());
        assert!(Cli::try_parse_from(["todo", "add", "x", "--priority", "urgent"]).is_err());
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["todo", "list", "--json", "--db", "/tmp/t.db"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("/tmp/t.db")));
    }

    #[test]
    fn edit_rejects_due_together_with_clear_due() {
        let result =
            Cli::try_parse_from(["todo", "edit", "3", "--due", "2024-01-01", "--clear-due"]);
        assert!(result.is_err());
    }

    #[test]
    fn calendar_month_must_be_in_range() {
        assert!(Cli::try_parse_from(["todo", "calendar", "--month", "13"]).is_err());
        assert!(Cli::try_parse_from(["todo", "calendar", "--month", "12"]).is_ok());
    }

    #[test]
    fn shell_lines_parse_without_binary_name() {
        let line = ShellLine::try_parse_from(["done", "4"]).unwrap();
        assert!(matches!(line.command, Command::Done { id: 4 }));
    }

    #[test]
    fn sort_arg_maps_to_task_sort() {
        assert_eq!(TaskSort::from(SortArg::Due), TaskSort::DueDate);
        assert_eq!(TaskSort::from(SortArg::Priority), TaskSort::Priority);
        assert_eq!(TaskSort::from(SortArg::Created), TaskSort::Created);
    }
}
