//! Terminal rendering of command outcomes.
//!
//! Human mode prints tables and detail blocks to stdout; JSON mode prints
//! the serialized `Outcome`. Errors go to stderr.

use crate::commands::Outcome;
use anyhow::Result;
use chrono::{Local, NaiveDate, TimeZone};
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use todo_core::{CalendarMonth, DueStatus, PasswordResetTicket, Priority, Task, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Prints `outcome` to stdout in the selected mode.
pub fn render(outcome: &Outcome, mode: OutputMode, today: NaiveDate) -> Result<()> {
    match mode {
        OutputMode::Json => {
            println!("{}", serde_json::to_string_pretty(outcome)?);
            Ok(())
        }
        OutputMode::Human => {
            render_human(outcome, today);
            Ok(())
        }
    }
}

fn render_human(outcome: &Outcome, today: NaiveDate) {
    match outcome {
        Outcome::Registered(user) => print_success(&format!(
            "Registered {}; log in with `todo login {}`",
            user.username, user.username
        )),
        Outcome::LoggedIn(user) => print_success(&format!("Logged in as {}", user.username)),
        Outcome::LoggedOut { had_session } => {
            if *had_session {
                print_success("Logged out");
            } else {
                print_info("No active session");
            }
        }
        Outcome::Account(user) => display_account(user),
        Outcome::ResetIssued(ticket) => display_reset_ticket(ticket),
        Outcome::PasswordReset { .. } => {
            print_success("Password updated; all sessions were signed out")
        }
        Outcome::Added(task) => {
            print_success(&format!("Added task {}", task.id));
            display_task_details(task, today);
        }
        Outcome::Updated(task) => {
            print_success(&format!("Updated task {}", task.id));
            display_task_details(task, today);
        }
        Outcome::Completed(done) => {
            if done.changed {
                print_success(&format!("Completed task {}", done.task.id));
            } else {
                print_info(&format!("Task {} was already completed", done.task.id));
            }
            if let Some(next) = &done.spawned {
                print_info(&format!(
                    "Next occurrence: task {} due {}",
                    next.id,
                    format_due(next.due_date)
                ));
            }
        }
        Outcome::Reopened(task) => print_success(&format!("Reopened task {}", task.id)),
        Outcome::Deleted { id } => print_success(&format!("Deleted task {id}")),
        Outcome::Cancelled => print_warning("Cancelled"),
        Outcome::Shown(task) => display_task_details(task, today),
        Outcome::Tasks(tasks) => {
            if tasks.is_empty() {
                print_info("No tasks found");
            } else {
                println!("{}", task_table(tasks, today));
            }
        }
        Outcome::Tags(names) => display_names("Tags", names),
        Outcome::Categories(names) => display_names("Categories", names),
        Outcome::Calendar(month) => display_calendar(month, today),
    }
}

/// Table of tasks with urgency coloring on the due column.
pub fn task_table(tasks: &[Task], today: NaiveDate) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Done").fg(Color::Cyan),
        Cell::new("Title").fg(Color::Cyan),
        Cell::new("Priority").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Due").fg(Color::Cyan),
        Cell::new("Tags").fg(Color::Cyan),
        Cell::new("Repeat").fg(Color::Cyan),
    ]);

    for task in tasks {
        let mut title = Cell::new(&task.title);
        if task.completed {
            title = title.add_attribute(Attribute::CrossedOut).fg(Color::DarkGrey);
        }
        let mut due = Cell::new(format_due(task.due_date));
        if let Some(color) = task.due_status(today).map(due_color) {
            due = due.fg(color);
        }
        let tags = if task.tags.is_empty() {
            "-".to_string()
        } else {
            task.tags.join(", ")
        };

        table.add_row(vec![
            Cell::new(task.id),
            Cell::new(if task.completed { "✓" } else { "" }).fg(Color::Green),
            title,
            Cell::new(task.priority).fg(priority_color(task.priority)),
            Cell::new(&task.category),
            due,
            Cell::new(tags),
            Cell::new(task.recurrence),
        ]);
    }

    table
}

fn display_task_details(task: &Task, today: NaiveDate) {
    println!("{}", "═".repeat(60).dimmed());
    let state = if task.completed { "done" } else { "open" };
    println!(
        "{} {} {}",
        "Task".cyan().bold(),
        task.id.to_string().cyan().bold(),
        format!("[{state}]").yellow()
    );
    println!("{}", "═".repeat(60).dimmed());
    println!();

    println!("{}: {}", "Title".bold(), task.title);
    println!("{}: {}", "Category".bold(), task.category);
    println!("{}: {}", "Priority".bold(), priority_colored(task.priority));
    let due = format_due(task.due_date);
    match task.due_status(today) {
        Some(status) => println!("{}: {} ({})", "Due".bold(), due, due_label(status)),
        None => println!("{}: {}", "Due".bold(), due),
    }
    println!("{}: {}", "Repeat".bold(), task.recurrence);
    if !task.tags.is_empty() {
        println!("{}: {}", "Tags".bold(), task.tags.join(", "));
    }

    if !task.description.is_empty() {
        println!();
        println!("{}", "Description".bold().underline());
        println!("{}", task.description);
    }
    println!();
}

fn display_account(user: &User) {
    println!("{}: {}", "User".bold(), user.username);
    println!("{}: {}", "Email".bold(), user.email);
    println!("{}: {}", "Since".bold(), format_epoch_ms(user.created_at));
}

fn display_reset_ticket(ticket: &PasswordResetTicket) {
    print_success("Password reset token issued");
    println!("{}: {}", "Token".bold(), ticket.token);
    println!("{}: {}", "Expires".bold(), format_epoch_ms(ticket.expires_at));
    print_info("Run `todo reset-password --token <token>` to choose a new password");
}

fn display_names(title: &str, names: &[String]) {
    println!("{}", title.bold().underline());
    if names.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for name in names {
        println!("  {} {}", "•".dimmed(), name);
    }
}

fn display_calendar(month: &CalendarMonth, today: NaiveDate) {
    println!(
        "{}",
        format!("{}-{:02}", month.year, month.month).cyan().bold()
    );
    println!("{}", calendar_table(month, today));

    for day in month.busy_days() {
        println!();
        println!("{}", day.date.format("%a %Y-%m-%d").to_string().bold());
        for task in &day.tasks {
            let marker = if task.completed { "✓".green() } else { "•".normal() };
            println!(
                "  {} [{}] {} ({})",
                marker,
                task.id,
                task.title,
                priority_colored(task.priority)
            );
        }
    }
}

/// Month grid; each in-month cell shows the day number and task count.
pub fn calendar_table(month: &CalendarMonth, today: NaiveDate) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
            .into_iter()
            .map(|name| Cell::new(name).fg(Color::Cyan)),
    );

    for week in &month.weeks {
        table.add_row(week.iter().map(|slot| match slot {
            None => Cell::new(""),
            Some(day) => {
                let label = match day.tasks.len() {
                    0 => day.date.format("%-d").to_string(),
                    count => format!("{} ({count})", day.date.format("%-d")),
                };
                let cell = Cell::new(label);
                if day.date == today {
                    cell.add_attribute(Attribute::Bold).fg(Color::Green)
                } else if day.tasks.iter().any(|task| !task.completed) {
                    cell.fg(Color::Yellow)
                } else {
                    cell
                }
            }
        }));
    }

    table
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::DarkGrey,
    }
}

fn priority_colored(priority: Priority) -> String {
    match priority {
        Priority::High => "high".red().bold().to_string(),
        Priority::Medium => "medium".yellow().to_string(),
        Priority::Low => "low".dimmed().to_string(),
    }
}

fn due_color(status: DueStatus) -> Color {
    match status {
        DueStatus::Overdue => Color::Red,
        DueStatus::DueToday => Color::Yellow,
        DueStatus::DueSoon => Color::DarkYellow,
    }
}

fn due_label(status: DueStatus) -> colored::ColoredString {
    match status {
        DueStatus::Overdue => "overdue".red().bold(),
        DueStatus::DueToday => "due today".yellow(),
        DueStatus::DueSoon => "due soon".yellow(),
    }
}

fn format_due(due: Option<NaiveDate>) -> String {
    due.map_or_else(|| "-".to_string(), |date| date.format("%Y-%m-%d").to_string())
}

fn format_epoch_ms(value: i64) -> String {
    match Local.timestamp_millis_opt(value).single() {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => value.to_string(),
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print error message to stderr
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}
