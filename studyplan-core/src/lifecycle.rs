//! Task completion and the spaced-repetition side effect.

use chrono::NaiveDate;
use thiserror::Error;

use crate::stats::UserStats;
use crate::task::{Priority, Task, TaskStatus, TaskType, new_task_id};
use crate::time::due_date_after;

/// Days after completion at which review tasks fall due.
pub const REVIEW_OFFSETS_DAYS: [u64; 2] = [1, 7];

pub const REVIEW_DURATION_MINUTES: u32 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("no task with id '{0}'")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed {
        /// Ids of review tasks appended to the store.
        reviews: Vec<String>,
        /// Badges earned by this completion.
        badges: Vec<String>,
    },
    /// Already completed; nothing changed.
    AlreadyCompleted,
}

/// Mark `task_id` completed, award xp and schedule reviews for study sessions.
///
/// Only the matching task changes status. A second completion of the same
/// task is a no-op so reviews and xp are never stacked.
pub fn complete_task(
    tasks: &mut Vec<Task>,
    stats: &mut UserStats,
    task_id: &str,
    today: NaiveDate,
) -> Result<CompletionOutcome, LifecycleError> {
    let task = tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or_else(|| LifecycleError::NotFound(task_id.to_string()))?;

    if task.status == TaskStatus::Completed {
        tracing::debug!(task_id, "task already completed");
        return Ok(CompletionOutcome::AlreadyCompleted);
    }

    task.status = TaskStatus::Completed;
    let completed = task.clone();

    let badges = stats.record_completion(today);

    let mut reviews = Vec::new();
    if completed.task_type == TaskType::StudySession {
        for review in schedule_reviews(&completed, today) {
            reviews.push(review.id.clone());
            tasks.push(review);
        }
    }

    tracing::info!(
        task_id,
        title = %completed.title,
        reviews = reviews.len(),
        xp = stats.xp,
        "task completed"
    );

    Ok(CompletionOutcome::Completed { reviews, badges })
}

/// The review tasks for a completed study session, due at
/// [`REVIEW_OFFSETS_DAYS`] after `completed_on`.
pub fn schedule_reviews(original: &Task, completed_on: NaiveDate) -> Vec<Task> {
    REVIEW_OFFSETS_DAYS
        .iter()
        .map(|&days| Task {
            id: new_task_id(),
            title: format!("Review: {}", original.title),
            subject: original.subject.clone(),
            due_date: due_date_after(completed_on, days),
            duration_minutes: REVIEW_DURATION_MINUTES,
            status: TaskStatus::Todo,
            task_type: TaskType::Review,
            priority: Priority::Medium,
            is_spaced_repetition: Some(true),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 28).unwrap()
    }

    fn store() -> Vec<Task> {
        vec![
            Task::new("s1", "Cell Biology Ch. 3")
                .with_subject("Biology")
                .with_due_date("2024-01-28")
                .with_type(TaskType::StudySession),
            Task::new("a1", "Essay draft")
                .with_subject("English")
                .with_due_date("2024-01-28")
                .with_type(TaskType::Assignment),
            Task::new("e1", "Midterm")
                .with_subject("Physics")
                .with_due_date("2024-01-30")
                .with_type(TaskType::Exam),
        ]
    }

    #[test]
    fn study_session_spawns_two_reviews() {
        let mut tasks = store();
        let mut stats = UserStats::default();
        let out = complete_task(&mut tasks, &mut stats, "s1", day()).unwrap();

        assert_eq!(stats.xp, 500);
        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks[0].status, TaskStatus::Completed);
        assert_eq!(tasks[1].status, TaskStatus::Todo);
        assert_eq!(tasks[2].status, TaskStatus::Todo);

        let CompletionOutcome::Completed { reviews, .. } = out else {
            panic!("expected completion");
        };
        assert_eq!(reviews.len(), 2);

        let r: Vec<&Task> = tasks[3..].iter().collect();
        assert_eq!(r[0].due_date, "2024-01-29");
        assert_eq!(r[1].due_date, "2024-02-04");
        for review in r {
            assert_eq!(review.title, "Review: Cell Biology Ch. 3");
            assert_eq!(review.subject, "Biology");
            assert_eq!(review.duration_minutes, 20);
            assert_eq!(review.priority, Priority::Medium);
            assert_eq!(review.task_type, TaskType::Review);
            assert_eq!(review.status, TaskStatus::Todo);
            assert!(review.is_spaced_repetition());
            assert_ne!(review.id, "s1");
        }
        assert_ne!(tasks[3].id, tasks[4].id);
    }

    #[test]
    fn assignment_and_exam_spawn_nothing() {
        let mut tasks = store();
        let mut stats = UserStats::default();
        complete_task(&mut tasks, &mut stats, "a1", day()).unwrap();
        complete_task(&mut tasks, &mut stats, "e1", day()).unwrap();
        assert_eq!(tasks.len(), 3);
        assert_eq!(stats.xp, 550);
    }

    #[test]
    fn unknown_id_is_reported_and_changes_nothing() {
        let mut tasks = store();
        let mut stats = UserStats::default();
        let err = complete_task(&mut tasks, &mut stats, "nope", day()).unwrap_err();
        assert_eq!(err, LifecycleError::NotFound("nope".into()));
        assert_eq!(tasks, store());
        assert_eq!(stats, UserStats::default());
    }

    #[test]
    fn double_completion_is_a_no_op() {
        let mut tasks = store();
        let mut stats = UserStats::default();
        complete_task(&mut tasks, &mut stats, "s1", day()).unwrap();
        let out = complete_task(&mut tasks, &mut stats, "s1", day()).unwrap();
        assert_eq!(out, CompletionOutcome::AlreadyCompleted);
        assert_eq!(tasks.len(), 5);
        assert_eq!(stats.xp, 500);
    }
}
