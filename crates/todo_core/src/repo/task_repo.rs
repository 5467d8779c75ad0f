//! Task/tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD, completion and filtered listing over `tasks`.
//! - Own tag-link replacement with atomic semantics.
//!
//! # Invariants
//! - Every statement carries `user_id = ?`; tasks of other users are
//!   invisible and untouchable.
//! - Task row + tag links are written in one transaction.
//! - Tags are per user; the same name for two users is two rows.
//! - Text matching folds case with Rust's Unicode `to_lowercase`, not
//!   SQLite's ASCII-only `NOCASE`/`LIKE` folding.

use crate::model::task::{Priority, Recurrence, Task, TaskDraft, TaskId, DEFAULT_CATEGORIES};
use crate::model::user::UserId;
use crate::repo::{bool_to_int, ensure_tables, int_to_bool, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    title,
    description,
    category,
    due_date,
    priority,
    completed,
    recurrence,
    created_at,
    updated_at
FROM tasks";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ordering applied by `list_tasks`. Ties always break by ascending id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    /// Earliest due date first; undated tasks last.
    #[default]
    DueDate,
    /// High, then medium, then low.
    Priority,
    /// Oldest first.
    Created,
}

impl TaskSort {
    fn order_by_sql(self) -> &'static str {
        match self {
            Self::DueDate => " ORDER BY due_date IS NULL, due_date ASC, id ASC",
            Self::Priority => {
                " ORDER BY CASE priority
                    WHEN 'high' THEN 0
                    WHEN 'medium' THEN 1
                    ELSE 2
                 END ASC, id ASC"
            }
            Self::Created => " ORDER BY created_at ASC, id ASC",
        }
    }
}

/// Filter/sort options for listing one user's tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListQuery {
    /// Exact category match (case-insensitive).
    pub category: Option<String>,
    pub priority: Option<Priority>,
    /// Matches tasks carrying at least one of these (normalized) tags.
    pub tags_any: Vec<String>,
    pub include_completed: bool,
    /// Case-insensitive substring over title, description and category.
    pub search: Option<String>,
    /// Inclusive due-date window; undated tasks never match a window.
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
    pub sort: TaskSort,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Default for TaskListQuery {
    fn default() -> Self {
        Self {
            category: None,
            priority: None,
            tags_any: Vec::new(),
            include_completed: true,
            search: None,
            due_from: None,
            due_to: None,
            sort: TaskSort::default(),
            limit: None,
            offset: 0,
        }
    }
}

/// Result of a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// `false` when the task was already completed.
    pub changed: bool,
    /// Follow-up task created in the same transaction, if any.
    pub spawned: Option<TaskId>,
}

/// Repository interface for task operations scoped to one owner.
pub trait TaskRepository {
    /// Inserts a normalized draft and its tags; returns the new id.
    fn create_task(&mut self, user_id: UserId, draft: &TaskDraft) -> RepoResult<TaskId>;
    /// Replaces every editable field, tags included.
    fn update_task(&mut self, user_id: UserId, id: TaskId, draft: &TaskDraft) -> RepoResult<()>;
    /// Marks a task completed. When it was open and has never produced a
    /// follow-up, `follow_up` is asked for a draft to insert as the next
    /// occurrence within the same transaction.
    fn complete_task(
        &mut self,
        user_id: UserId,
        id: TaskId,
        follow_up: &dyn Fn(&Task) -> Option<TaskDraft>,
    ) -> RepoResult<CompletionOutcome>;
    /// Clears the completed flag. Returns whether the row changed.
    fn reopen_task(&self, user_id: UserId, id: TaskId) -> RepoResult<bool>;
    fn delete_task(&self, user_id: UserId, id: TaskId) -> RepoResult<()>;
    fn get_task(&self, user_id: UserId, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, user_id: UserId, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    /// All tag names known for the user, sorted.
    fn list_tags(&self, user_id: UserId) -> RepoResult<Vec<String>>;
    /// Default categories first, then the user's other categories sorted.
    fn list_categories(&self, user_id: UserId) -> RepoResult<Vec<String>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["tasks", "tags", "task_tags"])?;
        register_fold_case(conn)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(&mut self, user_id: UserId, draft: &TaskDraft) -> RepoResult<TaskId> {
        let draft = draft.normalized()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id = insert_task_in_tx(&tx, user_id, &draft)?;
        tx.commit()?;
        Ok(id)
    }

    fn update_task(&mut self, user_id: UserId, id: TaskId, draft: &TaskDraft) -> RepoResult<()> {
        let draft = draft.normalized()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE tasks
             SET
                title = ?1,
                description = ?2,
                category = ?3,
                due_date = ?4,
                priority = ?5,
                recurrence = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?7
               AND user_id = ?8;",
            params![
                draft.title.as_str(),
                draft.description.as_str(),
                draft.category.as_str(),
                draft.due_date.map(date_to_db),
                draft.priority.as_str(),
                draft.recurrence.as_str(),
                id,
                user_id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "task", id });
        }

        replace_tags_in_tx(&tx, user_id, id, &draft.tags)?;
        tx.commit()?;
        Ok(())
    }

    fn complete_task(
        &mut self,
        user_id: UserId,
        id: TaskId,
        follow_up: &dyn Fn(&Task) -> Option<TaskDraft>,
    ) -> RepoResult<CompletionOutcome> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let task = load_task(&tx, user_id, id)?.ok_or(RepoError::NotFound { entity: "task", id })?;

        if task.completed {
            return Ok(CompletionOutcome {
                changed: false,
                spawned: None,
            });
        }

        let next_spawned: i64 = tx.query_row(
            "SELECT next_spawned FROM tasks WHERE id = ?1 AND user_id = ?2;",
            params![id, user_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "UPDATE tasks
             SET completed = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2
               AND user_id = ?3;",
            params![bool_to_int(true), id, user_id],
        )?;

        // The flag survives reopen: a task spawns at most one follow-up.
        let spawned = match follow_up(&task) {
            Some(draft) if !int_to_bool(next_spawned, "tasks.next_spawned")? => {
                let next_id = insert_task_in_tx(&tx, user_id, &draft.normalized()?)?;
                tx.execute(
                    "UPDATE tasks SET next_spawned = 1 WHERE id = ?1 AND user_id = ?2;",
                    params![id, user_id],
                )?;
                Some(next_id)
            }
            _ => None,
        };

        tx.commit()?;
        Ok(CompletionOutcome {
            changed: true,
            spawned,
        })
    }

    fn reopen_task(&self, user_id: UserId, id: TaskId) -> RepoResult<bool> {
        let exists = task_exists(self.conn, user_id, id)?;
        if !exists {
            return Err(RepoError::NotFound { entity: "task", id });
        }
        let changed = self.conn.execute(
            "UPDATE tasks
             SET completed = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2
               AND user_id = ?3
               AND completed = ?4;",
            params![bool_to_int(false), id, user_id, bool_to_int(true)],
        )?;
        Ok(changed > 0)
    }

    fn delete_task(&self, user_id: UserId, id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2;",
            params![id, user_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "task", id });
        }
        Ok(())
    }

    fn get_task(&self, user_id: UserId, id: TaskId) -> RepoResult<Option<Task>> {
        load_task(self.conn, user_id, id)
    }

    fn list_tasks(&self, user_id: UserId, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE user_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Integer(user_id)];

        if !query.include_completed {
            sql.push_str(" AND completed = 0");
        }

        if let Some(category) = query.category.as_ref() {
            sql.push_str(" AND fold_case(category) = ?");
            bind_values.push(Value::Text(category.trim().to_lowercase()));
        }

        if let Some(priority) = query.priority {
            sql.push_str(" AND priority = ?");
            bind_values.push(Value::Text(priority.as_str().to_string()));
        }

        if !query.tags_any.is_empty() {
            let placeholders = vec!["?"; query.tags_any.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (
                    SELECT 1
                    FROM task_tags tt
                    INNER JOIN tags t ON t.id = tt.tag_id
                    WHERE tt.task_id = tasks.id
                      AND t.name IN ({placeholders})
                )"
            ));
            for tag in &query.tags_any {
                bind_values.push(Value::Text(tag.trim().to_lowercase()));
            }
        }

        if let Some(search) = query.search.as_deref().map(str::trim) {
            if !search.is_empty() {
                sql.push_str(
                    " AND (fold_case(title) LIKE ? ESCAPE '\\'
                       OR fold_case(description) LIKE ? ESCAPE '\\'
                       OR fold_case(category) LIKE ? ESCAPE '\\')",
                );
                let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
                for _ in 0..3 {
                    bind_values.push(Value::Text(pattern.clone()));
                }
            }
        }

        if let Some(from) = query.due_from {
            sql.push_str(" AND due_date >= ?");
            bind_values.push(Value::Text(date_to_db(from)));
        }

        if let Some(to) = query.due_to {
            sql.push_str(" AND due_date <= ?");
            bind_values.push(Value::Text(date_to_db(to)));
        }

        sql.push_str(query.sort.order_by_sql());

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            let mut task = parse_task_row(row)?;
            task.tags = load_tags_for_task(self.conn, task.id)?;
            tasks.push(task);
        }

        Ok(tasks)
    }

    fn list_tags(&self, user_id: UserId) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM tags WHERE user_id = ?1 ORDER BY name ASC;")?;
        let tags = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn list_categories(&self, user_id: UserId) -> RepoResult<Vec<String>> {
        let mut categories: Vec<String> = DEFAULT_CATEGORIES
            .iter()
            .map(|category| category.to_string())
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT category
             FROM tasks
             WHERE user_id = ?1
             ORDER BY fold_case(category) ASC, category ASC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        while let Some(row) = rows.next()? {
            let category: String = row.get(0)?;
            let folded = category.to_lowercase();
            if !categories
                .iter()
                .any(|known| known.to_lowercase() == folded)
            {
                categories.push(category);
            }
        }
        Ok(categories)
    }
}

fn register_fold_case(conn: &Connection) -> RepoResult<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )?;
    Ok(())
}

fn insert_task_in_tx(tx: &Transaction<'_>, user_id: UserId, draft: &TaskDraft) -> RepoResult<TaskId> {
    tx.execute(
        "INSERT INTO tasks (
            user_id,
            title,
            description,
            category,
            due_date,
            priority,
            recurrence
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            user_id,
            draft.title.as_str(),
            draft.description.as_str(),
            draft.category.as_str(),
            draft.due_date.map(date_to_db),
            draft.priority.as_str(),
            draft.recurrence.as_str(),
        ],
    )?;
    let id = tx.last_insert_rowid();
    replace_tags_in_tx(tx, user_id, id, &draft.tags)?;
    Ok(id)
}

fn replace_tags_in_tx(
    tx: &Transaction<'_>,
    user_id: UserId,
    task_id: TaskId,
    tags: &[String],
) -> RepoResult<()> {
    tx.execute("DELETE FROM task_tags WHERE task_id = ?1;", [task_id])?;
    for tag in tags {
        tx.execute(
            "INSERT OR IGNORE INTO tags (user_id, name) VALUES (?1, ?2);",
            params![user_id, tag.as_str()],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO task_tags (task_id, tag_id)
             SELECT ?1, id
             FROM tags
             WHERE user_id = ?2
               AND name = ?3;",
            params![task_id, user_id, tag.as_str()],
        )?;
    }
    Ok(())
}

fn load_task(conn: &Connection, user_id: UserId, id: TaskId) -> RepoResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!(
        "{TASK_SELECT_SQL}
         WHERE id = ?1
           AND user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![id, user_id])?;
    if let Some(row) = rows.next()? {
        let mut task = parse_task_row(row)?;
        task.tags = load_tags_for_task(conn, task.id)?;
        return Ok(Some(task));
    }
    Ok(None)
}

fn task_exists(conn: &Connection, user_id: UserId, id: TaskId) -> RepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM tasks WHERE id = ?1 AND user_id = ?2;",
            params![id, user_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn load_tags_for_task(conn: &Connection, task_id: TaskId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM task_tags tt
         INNER JOIN tags t ON t.id = tt.tag_id
         WHERE tt.task_id = ?1
         ORDER BY t.name ASC;",
    )?;
    let tags = stmt
        .query_map([task_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id: TaskId = row.get("id")?;

    let priority_text: String = row.get("priority")?;
    let priority = Priority::from_str(&priority_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in tasks.priority (id={id})"
        ))
    })?;

    let recurrence_text: String = row.get("recurrence")?;
    let recurrence = Recurrence::from_str(&recurrence_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid recurrence `{recurrence_text}` in tasks.recurrence (id={id})"
        ))
    })?;

    let due_date = match row.get::<_, Option<String>>("due_date")? {
        Some(value) => Some(NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid date `{value}` in tasks.due_date (id={id})"
            ))
        })?),
        None => None,
    };

    Ok(Task {
        id,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        priority,
        due_date,
        tags: Vec::new(),
        completed: int_to_bool(row.get("completed")?, "tasks.completed")?,
        recurrence,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escape_like_protects_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
