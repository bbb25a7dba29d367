//! Task data model.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Board column a task sits in. Any status can move to any other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskStatus {
    #[serde(rename = "TO-DO", alias = "PENDING")]
    Pending,
    #[serde(rename = "IN-PROGRESS", alias = "IN_PROGRESS")]
    InProgress,
    #[serde(rename = "COMPLETED", alias = "DONE")]
    Done,
}

impl TaskStatus {
    /// Board order.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Done];

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "TO-DO",
            TaskStatus::InProgress => "IN-PROGRESS",
            TaskStatus::Done => "COMPLETED",
        }
    }

    pub fn index(self) -> usize {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Done => 2,
        }
    }

    /// Wraps around from Done back to Pending.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "todo" | "pending" => Ok(TaskStatus::Pending),
            "inprogress" | "doing" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Done),
            _ => Err(Error::InvalidArgument(format!(
                "unknown status '{raw}' (expected todo, in-progress or done)"
            ))),
        }
    }
}

/// Fixed tag vocabulary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Work,
    Personal,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Work, Category::Personal];

    pub fn label(self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown category '{raw}' (expected Work or Personal)"
                ))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: NaiveDate,
    pub category: BTreeSet<Category>,
    pub status: TaskStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl Task {
    pub fn categories_label(&self) -> String {
        self.category
            .iter()
            .map(|c| c.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Input for the guarded creation path. The owner and timestamps are filled
/// in by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub category: BTreeSet<Category>,
    pub status: TaskStatus,
    pub attachment: Option<String>,
}

impl NewTask {
    pub fn new(
        title: impl Into<String>,
        due_date: NaiveDate,
        category: impl IntoIterator<Item = Category>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due_date,
            category: category.into_iter().collect(),
            status: TaskStatus::Pending,
            attachment: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_attachment(mut self, attachment: impl Into<String>) -> Self {
        self.attachment = Some(attachment.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidTask("title is required".to_string()));
        }
        if self.category.is_empty() {
            return Err(Error::InvalidTask(
                "at least one category is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the stored record. Used by store implementations.
    pub fn into_task(self, id: String, owner: &str, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title.trim().to_string(),
            description: self.description,
            due_date: self.due_date,
            category: self.category,
            status: self.status,
            created_by: owner.to_string(),
            created_at: now,
            updated_at: now,
            attachment: self.attachment,
        }
    }
}

/// Partial field update. `attachment: Some(None)` clears the attachment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub category: Option<BTreeSet<Category>>,
    pub status: Option<TaskStatus>,
    pub attachment: Option<Option<String>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.category.is_none()
            && self.status.is_none()
            && self.attachment.is_none()
    }

    /// Edits must keep the task valid.
    pub fn validate(&self) -> Result<()> {
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            return Err(Error::InvalidTask("title cannot be empty".to_string()));
        }
        if matches!(&self.category, Some(category) if category.is_empty()) {
            return Err(Error::InvalidTask(
                "at least one category is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the present fields and stamp `updated_at`.
    pub fn apply_to(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(category) = &self.category {
            task.category = category.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(attachment) = &self.attachment {
            task.attachment = attachment.clone();
        }
        task.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn status_parses_original_and_canonical_spellings() {
        assert_eq!("TO-DO".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert_eq!("pending".parse::<TaskStatus>().unwrap(), TaskStatus::Pending);
        assert_eq!("In Progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("IN_PROGRESS".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("completed".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("archived".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn status_cycles_through_board_columns() {
        assert_eq!(TaskStatus::Pending.next(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::Done.next(), TaskStatus::Pending);
        assert_eq!(TaskStatus::Pending.prev(), TaskStatus::Done);
    }

    #[test]
    fn status_serializes_with_board_labels() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN-PROGRESS\"");
        let parsed: TaskStatus = serde_json::from_str("\"DONE\"").unwrap();
        assert_eq!(parsed, TaskStatus::Done);
    }

    #[test]
    fn new_task_requires_title_and_category() {
        let missing_title = NewTask::new("  ", date(2025, 1, 10), [Category::Work]);
        assert!(matches!(missing_title.validate(), Err(Error::InvalidTask(_))));

        let missing_category = NewTask::new("Ship invoice", date(2025, 1, 10), Vec::<Category>::new());
        assert!(matches!(missing_category.validate(), Err(Error::InvalidTask(_))));

        let ok = NewTask::new("Ship invoice", date(2025, 1, 10), [Category::Work]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn patch_applies_present_fields_and_stamps_update() {
        let created = Utc::now();
        let mut task = NewTask::new("Draft", date(2025, 1, 10), [Category::Personal])
            .with_attachment("notes.pdf")
            .into_task("t1".into(), "ada", created);

        let later = created + chrono::Duration::seconds(5);
        let patch = TaskPatch {
            title: Some("Final".into()),
            attachment: Some(None),
            ..TaskPatch::status(TaskStatus::Done)
        };
        patch.apply_to(&mut task, later);

        assert_eq!(task.title, "Final");
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.attachment, None);
        assert_eq!(task.description, "");
        assert_eq!(task.updated_at, later);
        assert_eq!(task.created_at, created);
    }

    #[test]
    fn task_json_uses_document_field_names() {
        let task = NewTask::new("Pay rent", date(2025, 2, 1), [Category::Personal])
            .into_task("t9".into(), "ada", Utc::now());
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["dueDate"], "2025-02-01");
        assert_eq!(value["createdBy"], "ada");
        assert_eq!(value["status"], "TO-DO");
        assert!(value.get("attachment").is_none());
    }
}
