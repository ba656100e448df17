//! Task model shared by the planner, the views and the AI integration.
//!
//! Field names serialize in camelCase so the persisted blob keeps the shape
//! `{ id, title, subject, dueDate, durationMinutes, status, type, priority }`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    /// Reserved; never assigned automatically.
    InProgress,
    Completed,
    /// Reserved; never assigned automatically.
    Missed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Assignment,
    Exam,
    StudySession,
    /// Only produced by the spaced-repetition scheduler.
    Review,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Assignment => "ASSIGNMENT",
            TaskType::Exam => "EXAM",
            TaskType::StudySession => "STUDY_SESSION",
            TaskType::Review => "REVIEW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Default priority for a task type: exams high, assignments medium,
    /// study sessions low.
    pub fn for_type(task_type: TaskType) -> Self {
        match task_type {
            TaskType::Exam => Priority::High,
            TaskType::Assignment => Priority::Medium,
            TaskType::StudySession => Priority::Low,
            TaskType::Review => Priority::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Core task type.
///
/// `due_date` stays a `YYYY-MM-DD` string: ordering and overdue detection
/// compare it lexicographically, which only holds for the zero-padded form
/// (see [`crate::time::parse_due_date`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub due_date: String,

    /// Minutes.
    pub duration_minutes: u32,

    pub status: TaskStatus,

    #[serde(rename = "type")]
    pub task_type: TaskType,

    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_spaced_repetition: Option<bool>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subject: String::new(),
            due_date: String::new(),
            duration_minutes: 60,
            status: TaskStatus::Todo,
            task_type: TaskType::StudySession,
            priority: Priority::Medium,
            is_spaced_repetition: None,
        }
    }

    /// New task with a fresh random id.
    pub fn with_fresh_id(title: impl Into<String>) -> Self {
        Self::new(new_task_id(), title)
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = due_date.into();
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_spaced_repetition(&self) -> bool {
        self.is_spaced_repetition.unwrap_or(false)
    }
}

pub fn new_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
