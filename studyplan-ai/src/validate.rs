//! Boundary between model JSON and typed tasks.
//!
//! Each element is validated on its own; a bad element is dropped without
//! sinking the rest of the batch.

use serde_json::Value;
use studyplan_core::time::is_valid_due_date;
use studyplan_core::{Priority, Task, TaskStatus, TaskType, new_task_id};

use crate::error::ValidationError;

const STUDY_MINUTES: u32 = 60;
const DELIVERABLE_MINUTES: u32 = 120;

/// Map a model-supplied type string onto the closed set the generator may
/// produce. `REVIEW` and anything unknown become a study session.
pub fn parse_task_type(raw: &str) -> TaskType {
    let norm = raw.trim().to_ascii_uppercase().replace([' ', '-'], "_");
    match norm.as_str() {
        "ASSIGNMENT" => TaskType::Assignment,
        "EXAM" => TaskType::Exam,
        _ => TaskType::StudySession,
    }
}

pub fn parse_priority(raw: Option<&str>, task_type: TaskType) -> Priority {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("high") => Priority::High,
        Some("medium") => Priority::Medium,
        Some("low") => Priority::Low,
        _ => Priority::for_type(task_type),
    }
}

fn default_duration(task_type: TaskType) -> u32 {
    match task_type {
        TaskType::StudySession | TaskType::Review => STUDY_MINUTES,
        TaskType::Assignment | TaskType::Exam => DELIVERABLE_MINUTES,
    }
}

fn parse_duration(raw: Option<&Value>) -> Option<u32> {
    let minutes = match raw? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !minutes.is_finite() || minutes < 1.0 {
        return None;
    }
    Some(minutes.round().min(u32::MAX as f64) as u32)
}

fn required_str<'a>(obj: &'a serde_json::Map<String, Value>, field: &'static str) -> Result<&'a str, ValidationError> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingField(field))
}

/// One generated element into a fresh TODO task.
pub fn task_from_value(v: &Value) -> Result<Task, ValidationError> {
    let obj = v.as_object().ok_or(ValidationError::NotAnObject)?;

    let title = required_str(obj, "title")?;
    let subject = required_str(obj, "subject")?;
    let due_date = required_str(obj, "dueDate")?;
    if !is_valid_due_date(due_date) {
        return Err(ValidationError::InvalidDate(due_date.to_string()));
    }

    let task_type = obj
        .get("type")
        .and_then(Value::as_str)
        .map(parse_task_type)
        .unwrap_or(TaskType::StudySession);
    let priority = parse_priority(obj.get("priority").and_then(Value::as_str), task_type);
    let duration = parse_duration(obj.get("durationMinutes")).unwrap_or_else(|| default_duration(task_type));

    Ok(Task {
        id: new_task_id(),
        title: title.to_string(),
        subject: subject.to_string(),
        due_date: due_date.to_string(),
        duration_minutes: duration,
        status: TaskStatus::Todo,
        task_type,
        priority,
        is_spaced_repetition: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_element() {
        let t = task_from_value(&json!({
            "title": "Midterm 1",
            "subject": "Organic Chemistry",
            "dueDate": "2024-10-15",
            "type": "EXAM",
            "priority": "high",
            "durationMinutes": 120
        }))
        .unwrap();
        assert_eq!(t.task_type, TaskType::Exam);
        assert_eq!(t.priority, Priority::High);
        assert_eq!(t.duration_minutes, 120);
        assert_eq!(t.status, TaskStatus::Todo);
        assert!(!t.id.is_empty());
    }

    #[test]
    fn unknown_type_and_review_become_study_session() {
        assert_eq!(parse_task_type("LECTURE"), TaskType::StudySession);
        assert_eq!(parse_task_type("REVIEW"), TaskType::StudySession);
        assert_eq!(parse_task_type("study session"), TaskType::StudySession);
        assert_eq!(parse_task_type(" assignment "), TaskType::Assignment);
        assert_eq!(parse_task_type("Exam"), TaskType::Exam);
    }

    #[test]
    fn missing_priority_and_duration_use_type_defaults() {
        let t = task_from_value(&json!({
            "title": "Essay 2",
            "subject": "History",
            "dueDate": "2024-11-01",
            "type": "ASSIGNMENT",
            "priority": "urgent"
        }))
        .unwrap();
        assert_eq!(t.priority, Priority::Medium);
        assert_eq!(t.duration_minutes, 120);

        let s = task_from_value(&json!({
            "title": "Chapter 4",
            "subject": "History",
            "dueDate": "2024-10-20",
            "durationMinutes": 44.6
        }))
        .unwrap();
        assert_eq!(s.task_type, TaskType::StudySession);
        assert_eq!(s.priority, Priority::Low);
        assert_eq!(s.duration_minutes, 45);
    }

    #[test]
    fn rejects_bad_elements() {
        assert_eq!(task_from_value(&json!("nope")), Err(ValidationError::NotAnObject));
        assert_eq!(
            task_from_value(&json!({ "subject": "X", "dueDate": "2024-10-20" })),
            Err(ValidationError::MissingField("title"))
        );
        assert_eq!(
            task_from_value(&json!({ "title": "T", "subject": "X", "dueDate": "Week 5" })),
            Err(ValidationError::InvalidDate("Week 5".into()))
        );
    }

    #[test]
    fn non_positive_duration_falls_back() {
        let t = task_from_value(&json!({
            "title": "Quiz prep", "subject": "Stats", "dueDate": "2024-10-20",
            "type": "EXAM", "durationMinutes": 0
        }))
        .unwrap();
        assert_eq!(t.duration_minutes, 120);
    }
}
