//! Task use-case service.
//!
//! # Responsibility
//! - Provide add/edit/complete/reopen/delete/list APIs for one acting user.
//! - Spawn the next occurrence when a recurring task is completed.
//! - Build the month calendar view.
//!
//! # Invariants
//! - Every call takes the acting `UserId`; foreign ids surface as
//!   `TaskNotFound`, never as another user's data.
//! - Completing an already completed task is a no-op and spawns nothing.

use crate::model::task::{Task, TaskDraft, TaskId};
use crate::model::user::UserId;
use crate::model::validation::ValidationError;
use crate::repo::task_repo::{TaskListQuery, TaskRepository};
use crate::repo::RepoError;
use crate::service::calendar::{build_month, month_bounds, CalendarMonth};
use chrono::NaiveDate;
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for task use-cases.
#[derive(Debug)]
pub enum TaskServiceError {
    Validation(ValidationError),
    /// Task does not exist for the acting user.
    TaskNotFound(TaskId),
    InvalidMonth { year: i32, month: u32 },
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::TaskNotFound(id) => write!(f, "task with id {id} not found"),
            Self::InvalidMonth { year, month } => write!(f, "invalid month {year}-{month:02}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent task state: {details}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for TaskServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "task",
                id,
            } => Self::TaskNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

/// Outcome of `complete_task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedTask {
    /// The task after completion.
    pub task: Task,
    /// `false` when it was already completed.
    pub changed: bool,
    /// Next occurrence created for a recurring task.
    pub spawned: Option<Task>,
}

/// Task service facade over a task repository.
pub struct TaskService<R: TaskRepository> {
    repo: R,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a task from a draft and returns the stored record.
    pub fn add_task(&mut self, user_id: UserId, draft: &TaskDraft) -> TaskServiceResult<Task> {
        let id = self.repo.create_task(user_id, draft)?;
        info!("event=task_add module=task status=ok user_id={user_id} task_id={id}");
        self.read_back(user_id, id, "created task not found in read-back")
    }

    /// Replaces all editable fields of a task, tags included.
    pub fn edit_task(
        &mut self,
        user_id: UserId,
        id: TaskId,
        draft: &TaskDraft,
    ) -> TaskServiceResult<Task> {
        self.repo.update_task(user_id, id, draft)?;
        info!("event=task_edit module=task status=ok user_id={user_id} task_id={id}");
        self.read_back(user_id, id, "edited task not found in read-back")
    }

    /// Marks a task completed; idempotent.
    ///
    /// On the first completion of a recurring task the next occurrence is
    /// created with its due date advanced past `today` (see
    /// [`next_occurrence_draft`]).
    pub fn complete_task(
        &mut self,
        user_id: UserId,
        id: TaskId,
        today: NaiveDate,
    ) -> TaskServiceResult<CompletedTask> {
        let outcome = self.repo.complete_task(user_id, id, &|task: &Task| {
            next_occurrence_draft(task, today)
        })?;

        let task = self.read_back(user_id, id, "completed task not found in read-back")?;
        let spawned = match outcome.spawned {
            Some(spawned_id) => Some(self.read_back(
                user_id,
                spawned_id,
                "spawned occurrence not found in read-back",
            )?),
            None => None,
        };

        info!(
            "event=task_complete module=task status=ok user_id={user_id} task_id={id} changed={} spawned={}",
            outcome.changed,
            outcome
                .spawned
                .map_or_else(|| "none".to_string(), |value| value.to_string())
        );
        Ok(CompletedTask {
            task,
            changed: outcome.changed,
            spawned,
        })
    }

    /// Clears the completed flag; idempotent.
    pub fn reopen_task(&self, user_id: UserId, id: TaskId) -> TaskServiceResult<Task> {
        let changed = self.repo.reopen_task(user_id, id)?;
        info!("event=task_reopen module=task status=ok user_id={user_id} task_id={id} changed={changed}");
        self.read_back(user_id, id, "reopened task not found in read-back")
    }

    pub fn delete_task(&self, user_id: UserId, id: TaskId) -> TaskServiceResult<()> {
        self.repo.delete_task(user_id, id)?;
        info!("event=task_delete module=task status=ok user_id={user_id} task_id={id}");
        Ok(())
    }

    pub fn get_task(&self, user_id: UserId, id: TaskId) -> TaskServiceResult<Option<Task>> {
        Ok(self.repo.get_task(user_id, id)?)
    }

    /// Lists the user's tasks with filter and sort options.
    pub fn list_tasks(
        &self,
        user_id: UserId,
        query: &TaskListQuery,
    ) -> TaskServiceResult<Vec<Task>> {
        Ok(self.repo.list_tasks(user_id, query)?)
    }

    pub fn list_tags(&self, user_id: UserId) -> TaskServiceResult<Vec<String>> {
        Ok(self.repo.list_tags(user_id)?)
    }

    pub fn list_categories(&self, user_id: UserId) -> TaskServiceResult<Vec<String>> {
        Ok(self.repo.list_categories(user_id)?)
    }

    /// Month grid of the user's tasks by due date (completed included).
    pub fn calendar_month(
        &self,
        user_id: UserId,
        year: i32,
        month: u32,
    ) -> TaskServiceResult<CalendarMonth> {
        let (first, last) =
            month_bounds(year, month).ok_or(TaskServiceError::InvalidMonth { year, month })?;
        let query = TaskListQuery {
            due_from: Some(first),
            due_to: Some(last),
            ..TaskListQuery::default()
        };
        let tasks = self.repo.list_tasks(user_id, &query)?;
        build_month(year, month, &tasks).ok_or(TaskServiceError::InvalidMonth { year, month })
    }

    fn read_back(
        &self,
        user_id: UserId,
        id: TaskId,
        details: &'static str,
    ) -> TaskServiceResult<Task> {
        self.repo
            .get_task(user_id, id)?
            .ok_or(TaskServiceError::InconsistentState(details))
    }
}

/// Draft for the next occurrence of a recurring task, or `None`.
///
/// The base date is the task's due date, falling back to `today` for
/// undated tasks. The result is never due before `today`.
pub fn next_occurrence_draft(task: &Task, today: NaiveDate) -> Option<TaskDraft> {
    if !task.recurrence.is_recurring() {
        return None;
    }
    let base = task.due_date.unwrap_or(today);
    let next_due = task.recurrence.next_occurrence(base, today)?;
    let mut draft = task.to_draft();
    draft.due_date = Some(next_due);
    Some(draft)
}

#[cfg(test)]
mod tests {
    use super::next_occurrence_draft;
    use crate::model::task::{Priority, Recurrence, Task};
    use chrono::NaiveDate;

    fn recurring(recurrence: Recurrence, due: Option<NaiveDate>) -> Task {
        Task {
            id: 7,
            user_id: 1,
            title: "water plants".to_string(),
            description: "balcony".to_string(),
            category: "Personal".to_string(),
            priority: Priority::Low,
            due_date: due,
            tags: vec!["home".to_string()],
            completed: false,
            recurrence,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn non_recurring_tasks_have_no_follow_up() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(next_occurrence_draft(&recurring(Recurrence::None, Some(today)), today).is_none());
    }

    #[test]
    fn follow_up_copies_fields_and_advances_due_date() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let task = recurring(Recurrence::Daily, NaiveDate::from_ymd_opt(2024, 1, 10));
        let draft = next_occurrence_draft(&task, today).unwrap();
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2024, 1, 11));
        assert_eq!(draft.title, "water plants");
        assert_eq!(draft.tags, vec!["home".to_string()]);
        assert_eq!(draft.recurrence, Recurrence::Daily);
    }

    #[test]
    fn undated_recurring_task_uses_today_as_base() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let draft = next_occurrence_draft(&recurring(Recurrence::Weekly, None), today).unwrap();
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2024, 1, 17));
    }
}
