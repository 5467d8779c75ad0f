//! Subcommand execution.
//!
//! # Responsibility
//! - Map parsed subcommands onto `AuthService` / `TaskService` calls.
//! - Resolve the acting user from the stored session token.
//!
//! # Invariants
//! - Task commands never run without a live session.
//! - A stored token whose session no longer exists is cleared.
//! - Execution returns an [`Outcome`]; rendering happens elsewhere.

use crate::cli::{AddArgs, Command, EditArgs, ListArgs, RegisterArgs, ResetPasswordArgs};
use crate::prompt::Prompt;
use crate::session::SessionStore;
use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use todo_core::{
    AuthService, CalendarMonth, CompletedTask, PasswordResetTicket, SqliteTaskRepository,
    SqliteUserRepository, Task, TaskDraft, TaskId, TaskListQuery, TaskService, TaskServiceError,
    TaskSort, User, UserId,
};

/// What a command produced.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Outcome {
    Registered(User),
    LoggedIn(User),
    LoggedOut { had_session: bool },
    Account(User),
    ResetIssued(PasswordResetTicket),
    PasswordReset { user_id: UserId },
    Added(Task),
    Updated(Task),
    Completed(CompletedTask),
    Reopened(Task),
    Deleted { id: TaskId },
    Cancelled,
    Shown(Task),
    Tasks(Vec<Task>),
    Tags(Vec<String>),
    Categories(Vec<String>),
    Calendar(CalendarMonth),
}

/// Everything a command needs besides its arguments.
pub struct Context<'a> {
    pub conn: &'a mut Connection,
    pub sessions: &'a mut dyn SessionStore,
    pub prompt: &'a dyn Prompt,
    pub today: NaiveDate,
    pub default_sort: TaskSort,
}

impl Context<'_> {
    fn auth(&mut self) -> Result<AuthService<SqliteUserRepository<'_>>> {
        Ok(AuthService::new(SqliteUserRepository::try_new(self.conn)?))
    }

    fn tasks(&mut self) -> Result<TaskService<SqliteTaskRepository<'_>>> {
        Ok(TaskService::new(SqliteTaskRepository::try_new(self.conn)?))
    }

    fn current_user(&mut self) -> Result<User> {
        let Some(token) = self.sessions.load()? else {
            bail!("not logged in; run `todo login` first");
        };
        let user = self.auth()?.current_user(token)?;
        match user {
            Some(user) => Ok(user),
            None => {
                self.sessions.clear()?;
                bail!("session has ended; log in again");
            }
        }
    }

    /// `given` or, when absent, a prompted value.
    fn password(&self, given: Option<String>, label: &str) -> Result<String> {
        match given {
            Some(password) => Ok(password),
            None => self.prompt.password(label),
        }
    }

    /// New password plus confirmation. A given password without an explicit
    /// confirmation confirms itself.
    fn new_password(
        &self,
        given: Option<String>,
        confirm: Option<String>,
    ) -> Result<(String, String)> {
        match (given, confirm) {
            (Some(password), Some(confirm)) => Ok((password, confirm)),
            (Some(password), None) => Ok((password.clone(), password)),
            (None, _) => Ok((
                self.prompt.password("Password")?,
                self.prompt.password("Confirm password")?,
            )),
        }
    }
}

pub fn execute(ctx: &mut Context<'_>, command: Command) -> Result<Outcome> {
    let name = command.name();
    let outcome = dispatch(ctx, command)?;
    info!("event=cli_command module=cli status=ok command={name}");
    Ok(outcome)
}

fn dispatch(ctx: &mut Context<'_>, command: Command) -> Result<Outcome> {
    match command {
        Command::Register(args) => register(ctx, args),
        Command::Login(args) => {
            let password = ctx.password(args.password, "Password")?;
            let login = ctx.auth()?.login(&args.identifier, &password)?;
            ctx.sessions.save(login.session.token)?;
            Ok(Outcome::LoggedIn(login.user))
        }
        Command::Logout => {
            let had_session = match ctx.sessions.load()? {
                Some(token) => ctx.auth()?.logout(token)?,
                None => false,
            };
            ctx.sessions.clear()?;
            Ok(Outcome::LoggedOut { had_session })
        }
        Command::Whoami => Ok(Outcome::Account(ctx.current_user()?)),
        Command::ResetRequest { email } => Ok(Outcome::ResetIssued(
            ctx.auth()?.request_password_reset(&email)?,
        )),
        Command::ResetPassword(args) => reset_password(ctx, args),
        Command::Add(args) => add(ctx, args),
        Command::Edit(args) => edit(ctx, args),
        Command::Done { id } => {
            let user = ctx.current_user()?;
            let today = ctx.today;
            Ok(Outcome::Completed(
                ctx.tasks()?.complete_task(user.id, id, today)?,
            ))
        }
        Command::Reopen { id } => {
            let user = ctx.current_user()?;
            Ok(Outcome::Reopened(ctx.tasks()?.reopen_task(user.id, id)?))
        }
        Command::Delete { id, yes } => {
            let user = ctx.current_user()?;
            if !yes && !ctx.prompt.confirm(&format!("Delete task {id}?"))? {
                return Ok(Outcome::Cancelled);
            }
            ctx.tasks()?.delete_task(user.id, id)?;
            Ok(Outcome::Deleted { id })
        }
        Command::Show { id } => {
            let user = ctx.current_user()?;
            let task = ctx
                .tasks()?
                .get_task(user.id, id)?
                .ok_or(TaskServiceError::TaskNotFound(id))?;
            Ok(Outcome::Shown(task))
        }
        Command::List(args) => list(ctx, args),
        Command::Tags => {
            let user = ctx.current_user()?;
            Ok(Outcome::Tags(ctx.tasks()?.list_tags(user.id)?))
        }
        Command::Categories => {
            let user = ctx.current_user()?;
            Ok(Outcome::Categories(ctx.tasks()?.list_categories(user.id)?))
        }
        Command::Calendar { year, month } => {
            let user = ctx.current_user()?;
            let year = year.unwrap_or(ctx.today.year());
            let month = month.unwrap_or(ctx.today.month());
            Ok(Outcome::Calendar(
                ctx.tasks()?.calendar_month(user.id, year, month)?,
            ))
        }
        Command::Shell { .. } => bail!("already inside the shell"),
    }
}

fn register(ctx: &mut Context<'_>, args: RegisterArgs) -> Result<Outcome> {
    let (password, confirm) = ctx.new_password(args.password, args.confirm_password)?;
    let user = ctx
        .auth()?
        .register(&args.username, &args.email, &password, &confirm)?;
    Ok(Outcome::Registered(user))
}

fn reset_password(ctx: &mut Context<'_>, args: ResetPasswordArgs) -> Result<Outcome> {
    let (password, confirm) = ctx.new_password(args.password, args.confirm_password)?;
    let user_id = ctx
        .auth()?
        .reset_password(&args.token, &password, &confirm)?;
    Ok(Outcome::PasswordReset { user_id })
}

fn add(ctx: &mut Context<'_>, args: AddArgs) -> Result<Outcome> {
    let user = ctx.current_user()?;
    let mut draft = TaskDraft::titled(args.title);
    draft.description = args.description;
    if let Some(category) = args.category {
        draft.category = category;
    }
    draft.priority = args.priority;
    draft.due_date = args.due;
    draft.tags = args.tags;
    draft.recurrence = args.repeat;
    Ok(Outcome::Added(ctx.tasks()?.add_task(user.id, &draft)?))
}

fn edit(ctx: &mut Context<'_>, args: EditArgs) -> Result<Outcome> {
    let user = ctx.current_user()?;
    let mut tasks = ctx.tasks()?;
    let existing = tasks
        .get_task(user.id, args.id)?
        .ok_or(TaskServiceError::TaskNotFound(args.id))?;

    let mut draft = existing.to_draft();
    if let Some(title) = args.title {
        draft.title = title;
    }
    if let Some(description) = args.description {
        draft.description = description;
    }
    if let Some(category) = args.category {
        draft.category = category;
    }
    if let Some(priority) = args.priority {
        draft.priority = priority;
    }
    if args.clear_due {
        draft.due_date = None;
    } else if let Some(due) = args.due {
        draft.due_date = Some(due);
    }
    if args.clear_tags {
        draft.tags.clear();
    } else if let Some(tags) = args.tags {
        draft.tags = tags;
    }
    if let Some(recurrence) = args.repeat {
        draft.recurrence = recurrence;
    }

    Ok(Outcome::Updated(tasks.edit_task(user.id, args.id, &draft)?))
}

fn list(ctx: &mut Context<'_>, args: ListArgs) -> Result<Outcome> {
    let user = ctx.current_user()?;
    let query = TaskListQuery {
        category: args.category,
        priority: args.priority,
        tags_any: args.tags,
        include_completed: !args.open,
        search: args.search,
        sort: args.sort.map(TaskSort::from).unwrap_or(ctx.default_sort),
        limit: args.limit,
        ..TaskListQuery::default()
    };
    Ok(Outcome::Tasks(ctx.tasks()?.list_tasks(user.id, &query)?))
}
