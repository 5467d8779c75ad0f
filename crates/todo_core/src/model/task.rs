//! Task domain model.
//!
//! # Responsibility
//! - Define the task record, its enumerated attributes and input draft.
//! - Compute recurrence dates and due-date urgency.
//!
//! # Invariants
//! - `title` and `category` are non-blank once a draft is normalized.
//! - `tags` are trimmed, lowercased, deduplicated and sorted.
//! - A spawned recurrence date is never earlier than the `today` it was
//!   computed for.

use crate::model::user::UserId;
use crate::model::validation::{required_text, ValidationError};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Row id of a task.
pub type TaskId = i64;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
pub const CATEGORY_MAX_CHARS: usize = 50;
pub const TAG_MAX_CHARS: usize = 32;
pub const DEFAULT_CATEGORY: &str = "Other";
pub const DEFAULT_CATEGORIES: [&str; 4] = ["Work", "Personal", "Shopping", "Other"];

/// Days ahead (inclusive) that still count as "due soon".
pub const DUE_SOON_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Storage/CLI token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Sort rank, most urgent first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// Repeat rule applied when a task is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub const ALL: [Recurrence; 4] = [
        Recurrence::None,
        Recurrence::Daily,
        Recurrence::Weekly,
        Recurrence::Monthly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn is_recurring(self) -> bool {
        self != Self::None
    }

    /// One recurrence step after `date`. `None` for non-recurring rules or
    /// calendar overflow. Monthly steps clamp to the last day of the month.
    pub fn step(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::None => None,
            Self::Daily => date.checked_add_days(Days::new(1)),
            Self::Weekly => date.checked_add_days(Days::new(7)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
        }
    }

    /// First occurrence strictly after `base` that is not before `today`.
    pub fn next_occurrence(self, base: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
        let mut next = self.step(base)?;
        while next < today {
            next = self.step(next)?;
        }
        Some(next)
    }
}

/// Error returned when parsing an enumerated task attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl Display for UnknownVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} `{}`", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "priority",
                value: value.to_string(),
            })
    }
}

impl FromStr for Recurrence {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "recurrence",
                value: value.to_string(),
            })
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for Recurrence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of an open task relative to a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    Overdue,
    DueToday,
    DueSoon,
}

/// Persisted task owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub completed: bool,
    pub recurrence: Recurrence,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Task {
    /// Editable fields of this task, e.g. as the base for an edit.
    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            priority: self.priority,
            due_date: self.due_date,
            tags: self.tags.clone(),
            recurrence: self.recurrence,
        }
    }

    /// Urgency relative to `today`. Completed or undated tasks have none.
    pub fn due_status(&self, today: NaiveDate) -> Option<DueStatus> {
        if self.completed {
            return None;
        }
        let due = self.due_date?;
        let days_left = (due - today).num_days();
        match days_left {
            d if d < 0 => Some(DueStatus::Overdue),
            0 => Some(DueStatus::DueToday),
            d if d <= DUE_SOON_DAYS => Some(DueStatus::DueSoon),
            _ => None,
        }
    }
}

/// User-editable task fields, used for both create and full-replace edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub recurrence: Recurrence,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            priority: Priority::default(),
            due_date: None,
            tags: Vec::new(),
            recurrence: Recurrence::default(),
        }
    }
}

impl TaskDraft {
    /// Draft with a title and default attributes.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Returns a trimmed, validated copy with normalized tags.
    ///
    /// A blank category falls back to `DEFAULT_CATEGORY`.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let title = required_text("title", &self.title, TITLE_MAX_CHARS)?;
        let description = self.description.trim().to_string();
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(ValidationError::TooLong {
                field: "description",
                max: DESCRIPTION_MAX_CHARS,
            });
        }
        let category = if self.category.trim().is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            required_text("category", &self.category, CATEGORY_MAX_CHARS)?
        };

        Ok(Self {
            title,
            description,
            category,
            priority: self.priority,
            due_date: self.due_date,
            tags: normalize_tags(&self.tags)?,
            recurrence: self.recurrence,
        })
    }
}

/// Normalizes one tag: trimmed and lowercased. Blank values are rejected.
pub fn normalize_tag(tag: &str) -> Result<String, ValidationError> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankTag);
    }
    if trimmed.chars().count() > TAG_MAX_CHARS {
        return Err(ValidationError::TooLong {
            field: "tag",
            max: TAG_MAX_CHARS,
        });
    }
    Ok(trimmed.to_lowercase())
}

/// Normalizes, deduplicates and sorts tag values.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        unique.insert(normalize_tag(tag)?);
    }
    Ok(unique.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn priority_and_recurrence_parse_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" weekly ".parse::<Recurrence>().unwrap(), Recurrence::Weekly);
        let err = "urgent".parse::<Priority>().unwrap_err();
        assert_eq!(err.kind, "priority");
    }

    #[test]
    fn monthly_step_clamps_to_month_end() {
        assert_eq!(
            Recurrence::Monthly.step(date(2024, 1, 31)),
            Some(date(2024, 2, 29))
        );
        assert_eq!(Recurrence::None.step(date(2024, 1, 31)), None);
    }

    #[test]
    fn next_occurrence_catches_up_to_today() {
        let base = date(2024, 3, 1);
        let today = date(2024, 3, 20);
        assert_eq!(
            Recurrence::Weekly.next_occurrence(base, today),
            Some(date(2024, 3, 22))
        );
        assert_eq!(
            Recurrence::Daily.next_occurrence(base, date(2024, 2, 1)),
            Some(date(2024, 3, 2))
        );
    }

    #[test]
    fn due_status_buckets_by_days_left() {
        let today = date(2024, 5, 10);
        let mut task = Task {
            id: 1,
            user_id: 1,
            title: "t".to_string(),
            description: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            priority: Priority::Medium,
            due_date: Some(date(2024, 5, 9)),
            tags: Vec::new(),
            completed: false,
            recurrence: Recurrence::None,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(task.due_status(today), Some(DueStatus::Overdue));
        task.due_date = Some(today);
        assert_eq!(task.due_status(today), Some(DueStatus::DueToday));
        task.due_date = Some(date(2024, 5, 13));
        assert_eq!(task.due_status(today), Some(DueStatus::DueSoon));
        task.due_date = Some(date(2024, 5, 14));
        assert_eq!(task.due_status(today), None);
        task.due_date = Some(date(2024, 5, 1));
        task.completed = true;
        assert_eq!(task.due_status(today), None);
    }

    #[test]
    fn draft_normalization_trims_and_dedupes_tags() {
        let draft = TaskDraft {
            title: "  Buy milk ".to_string(),
            category: "   ".to_string(),
            tags: vec!["Home".to_string(), " home".to_string(), "ERRANDS".to_string()],
            ..TaskDraft::default()
        };
        let normalized = draft.normalized().unwrap();
        assert_eq!(normalized.title, "Buy milk");
        assert_eq!(normalized.category, DEFAULT_CATEGORY);
        assert_eq!(normalized.tags, vec!["errands", "home"]);
    }

    #[test]
    fn draft_normalization_rejects_blank_title_and_tags() {
        assert_eq!(
            TaskDraft::titled("  ").normalized().unwrap_err(),
            ValidationError::EmptyField("title")
        );
        let draft = TaskDraft {
            tags: vec![" ".to_string()],
            ..TaskDraft::titled("x")
        };
        assert_eq!(draft.normalized().unwrap_err(), ValidationError::BlankTag);
    }

    #[test]
    fn task_serializes_with_lowercase_enums_and_iso_dates() {
        let task = Task {
            id: 3,
            user_id: 1,
            title: "Pay rent".to_string(),
            description: String::new(),
            category: "Personal".to_string(),
            priority: Priority::High,
            due_date: Some(date(2024, 6, 1)),
            tags: vec!["bills".to_string()],
            completed: false,
            recurrence: Recurrence::Monthly,
            created_at: 0,
            updated_at: 0,
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["priority"], "high");
        assert_eq!(value["recurrence"], "monthly");
        assert_eq!(value["due_date"], "2024-06-01");
    }
}
