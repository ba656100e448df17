//! Derived views over the task list. Pure; recomputed on every read.

use chrono::NaiveDate;
use serde::Serialize;

use crate::task::{Task, TaskStatus};
use crate::time::format_due_date;

pub const SUBJECT_COLORS: [&str; 6] = [
    "#3b82f6", // blue
    "#10b981", // emerald
    "#f59e0b", // amber
    "#ef4444", // red
    "#8b5cf6", // violet
    "#ec4899", // pink
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgress {
    pub subject: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub color: &'static str,
}

impl SubjectProgress {
    /// Rounded completion percentage; 0 for an empty subject.
    pub fn percent(&self) -> u32 {
        if self.total_tasks == 0 {
            return 0;
        }
        ((self.completed_tasks as f64 / self.total_tasks as f64) * 100.0).round() as u32
    }
}

/// Open tasks due on `today`.
pub fn todays_agenda<'a>(tasks: &'a [Task], today: NaiveDate) -> Vec<&'a Task> {
    let today = format_due_date(today);
    tasks
        .iter()
        .filter(|t| t.due_date == today && t.status != TaskStatus::Completed)
        .collect()
}

/// Open tasks due strictly before `today`.
pub fn overdue<'a>(tasks: &'a [Task], today: NaiveDate) -> Vec<&'a Task> {
    let today = format_due_date(today);
    tasks
        .iter()
        .filter(|t| t.due_date.as_str() < today.as_str() && t.status != TaskStatus::Completed)
        .collect()
}

pub fn completed_today(tasks: &[Task], today: NaiveDate) -> usize {
    let today = format_due_date(today);
    tasks
        .iter()
        .filter(|t| t.due_date == today && t.status == TaskStatus::Completed)
        .count()
}

/// Completion per subject, in first-seen order. Colors rotate over
/// [`SUBJECT_COLORS`] by that order, not alphabetically.
pub fn subject_progress(tasks: &[Task]) -> Vec<SubjectProgress> {
    let mut out: Vec<SubjectProgress> = Vec::new();

    for t in tasks {
        let idx = match out.iter().position(|p| p.subject == t.subject) {
            Some(i) => i,
            None => {
                let i = out.len();
                out.push(SubjectProgress {
                    subject: t.subject.clone(),
                    total_tasks: 0,
                    completed_tasks: 0,
                    color: SUBJECT_COLORS[i % SUBJECT_COLORS.len()],
                });
                i
            }
        };
        out[idx].total_tasks += 1;
        if t.is_completed() {
            out[idx].completed_tasks += 1;
        }
    }

    out
}

/// All tasks ordered by due date; ties keep store order.
pub fn schedule(tasks: &[Task]) -> Vec<&Task> {
    let mut out: Vec<&Task> = tasks.iter().collect();
    out.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    out
}
