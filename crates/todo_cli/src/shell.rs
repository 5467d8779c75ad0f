//! Interactive prompt running subcommands against one open connection.
//!
//! # Invariants
//! - A failing line prints its error and the loop continues.
//! - `exit`, `quit` or end of input ends the loop.

use crate::cli::ShellLine;
use crate::commands::{execute, Context};
use crate::output::{print_error, print_info, render, OutputMode};
use anyhow::Result;
use clap::Parser;
use log::info;
use std::io::{BufRead, Write};

const PROMPT: &str = "todo> ";

/// What to do with one input line.
#[derive(Debug)]
enum Line {
    Empty,
    Exit,
    Run(Box<ShellLine>),
    /// Already formatted message (parse error or help text).
    Message(String),
}

fn parse_line(raw: &str) -> Line {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Line::Empty;
    }
    if matches!(trimmed, "exit" | "quit") {
        return Line::Exit;
    }
    let Some(words) = shlex::split(trimmed) else {
        return Line::Message("unbalanced quotes".to_string());
    };
    match ShellLine::try_parse_from(words) {
        Ok(line) => Line::Run(Box::new(line)),
        Err(err) => Line::Message(err.render().to_string()),
    }
}

/// Runs the loop until exit. `ephemeral` is only reported in the banner.
pub fn run_shell(
    ctx: &mut Context<'_>,
    mode: OutputMode,
    ephemeral: bool,
    input: &mut dyn BufRead,
) -> Result<()> {
    info!("event=shell_start module=cli status=ok ephemeral={ephemeral}");
    if ephemeral {
        print_info("Ephemeral session: data is discarded on exit");
    }
    print_info("Type `help` for commands, `exit` to leave");

    let mut buffer = String::new();
    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        buffer.clear();
        if input.read_line(&mut buffer)? == 0 {
            println!();
            break;
        }

        match parse_line(&buffer) {
            Line::Empty => {}
            Line::Exit => break,
            Line::Message(message) => println!("{}", message.trim_end()),
            Line::Run(line) => {
                let outcome =
                    execute(ctx, line.command).and_then(|outcome| render(&outcome, mode, ctx.today));
                if let Err(err) = outcome {
                    print_error(&format!("{err:#}"));
                }
            }
        }
    }

    info!("event=shell_stop module=cli status=ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_line, run_shell, Line};
    use crate::cli::Command;
    use crate::commands::Context;
    use crate::output::OutputMode;
    use crate::prompt::Prompt;
    use crate::session::{MemorySessionStore, SessionStore};
    use chrono::NaiveDate;
    use todo_core::db::open_db_in_memory;
    use todo_core::TaskSort;

    struct NoPrompt;

    impl Prompt for NoPrompt {
        fn password(&self, _label: &str) -> anyhow::Result<String> {
            anyhow::bail!("no terminal")
        }

        fn confirm(&self, _question: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn blank_comment_and_exit_lines() {
        assert!(matches!(parse_line("   "), Line::Empty));
        assert!(matches!(parse_line("# note"), Line::Empty));
        assert!(matches!(parse_line("quit"), Line::Exit));
    }

    #[test]
    fn quoted_arguments_are_kept_together() {
        let Line::Run(line) = parse_line("add \"Buy milk\" -c Shopping") else {
            panic!("expected command");
        };
        let Command::Add(args) = line.command else {
            panic!("expected add");
        };
        assert_eq!(args.title, "Buy milk");
        assert_eq!(args.category.as_deref(), Some("Shopping"));
    }

    #[test]
    fn bad_lines_become_messages() {
        assert!(matches!(parse_line("add \"unterminated"), Line::Message(_)));
        assert!(matches!(parse_line("frobnicate"), Line::Message(_)));
        assert!(matches!(parse_line("help"), Line::Message(_)));
    }

    #[test]
    fn script_runs_until_exit_and_keeps_going_after_errors() {
        let mut conn = open_db_in_memory().unwrap();
        let mut sessions = MemorySessionStore::default();
        let mut ctx = Context {
            conn: &mut conn,
            sessions: &mut sessions,
            prompt: &NoPrompt,
            today: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            default_sort: TaskSort::DueDate,
        };
        let script = "\
list
register -u carol -e carol@example.com --password secret1
login carol --password secret1
add 'Call mom' --due 2024-05-11
exit
add 'never runs'
";
        let mut input = script.as_bytes();
        run_shell(&mut ctx, OutputMode::Json, true, &mut input).unwrap();

        assert!(sessions.load().unwrap().is_some());
        let titles: Vec<String> = conn
            .prepare("SELECT title FROM tasks ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(titles, vec!["Call mom".to_string()]);
    }
}
