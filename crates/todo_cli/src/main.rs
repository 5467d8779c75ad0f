//! `todo` command-line entry point.
//!
//! # Responsibility
//! - Resolve settings, start logging, open the database.
//! - Run one subcommand, or the interactive shell.
//! - Exit with status 1 and a message on stderr when anything fails.

mod cli;
mod commands;
mod config;
mod output;
mod prompt;
mod session;
mod shell;

use anyhow::{Context as _, Result};
use clap::Parser;
use cli::{Cli, Command};
use commands::{execute, Context};
use config::{FileConfig, Overrides, Settings};
use output::{render, OutputMode};
use prompt::TerminalPrompt;
use session::{FileSessionStore, MemorySessionStore};
use todo_core::db::{open_db, open_db_in_memory};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        output::print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    if let Err(err) = todo_core::init_logging(&settings.log_level, &settings.log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }

    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let today = chrono::Local::now().date_naive();

    if let Command::Shell { ephemeral: true } = cli.command {
        let mut conn = open_db_in_memory().context("cannot open in-memory database")?;
        let mut sessions = MemorySessionStore::default();
        let mut ctx = Context {
            conn: &mut conn,
            sessions: &mut sessions,
            prompt: &TerminalPrompt,
            today,
            default_sort: settings.default_sort,
        };
        return shell::run_shell(&mut ctx, mode, true, &mut std::io::stdin().lock());
    }

    if let Some(parent) = settings.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create `{}`", parent.display()))?;
    }
    let mut conn = open_db(&settings.db_path)
        .with_context(|| format!("cannot open database `{}`", settings.db_path.display()))?;
    let mut sessions = FileSessionStore::new(&settings.session_file);
    let mut ctx = Context {
        conn: &mut conn,
        sessions: &mut sessions,
        prompt: &TerminalPrompt,
        today,
        default_sort: settings.default_sort,
    };

    match cli.command {
        Command::Shell { .. } => {
            shell::run_shell(&mut ctx, mode, false, &mut std::io::stdin().lock())
        }
        command => {
            let outcome = execute(&mut ctx, command)?;
            render(&outcome, mode, today)
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let file = FileConfig::load(cli.config.as_deref())?;
    let overrides = Overrides {
        db_path: cli.db.clone(),
        log_level: cli.log_level.clone(),
    };
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    file.resolve(
        &overrides,
        |key| std::env::var(key).ok(),
        &cwd,
        &config::default_data_dir(),
    )
}
