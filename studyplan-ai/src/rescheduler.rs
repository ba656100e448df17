//! Overdue tasks → new due dates via the generative model.
//!
//! Deliberately lenient: no key, offline or a failed request never surface as
//! errors. Two distinct fallbacks exist:
//! - a reply that omits (or garbles) one task moves only that task to tomorrow;
//! - a failed request or unparseable reply moves every task to tomorrow.

use chrono::NaiveDate;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use studyplan_core::time::is_valid_due_date;
use studyplan_core::{Task, TaskStatus, due_date_after, format_due_date};

use crate::client::{Connectivity, GenerateRequest, GenerativeModel};
use crate::error::AiError;

/// Upcoming tasks sent as context.
pub const CONTEXT_LIMIT: usize = 10;

/// Cap on high-priority tasks per day requested from the model.
pub const MAX_HIGH_PRIORITY_PER_DAY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescheduleSource {
    /// Dates came from the model (per-task fallback may have applied).
    Model,
    /// Request failed; everything moved to tomorrow.
    Fallback,
    /// Offline or no key; dates unchanged.
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct RescheduleResult {
    /// Same ids and order as the input `missed`.
    pub tasks: Vec<Task>,
    pub source: RescheduleSource,
}

/// Soonest upcoming open tasks, excluding the ones being rescheduled.
pub fn upcoming_context<'a>(missed: &[Task], all_tasks: &'a [Task], today: NaiveDate) -> Vec<&'a Task> {
    let today = format_due_date(today);
    let missed_ids: HashSet<&str> = missed.iter().map(|t| t.id.as_str()).collect();

    let mut upcoming: Vec<&Task> = all_tasks
        .iter()
        .filter(|t| t.due_date >= today && t.status != TaskStatus::Completed)
        .filter(|t| !missed_ids.contains(t.id.as_str()))
        .collect();
    upcoming.sort_by(|a, b| a.due_date.cmp(&b.due_date));
    upcoming.truncate(CONTEXT_LIMIT);
    upcoming
}

pub fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "taskId": { "type": "STRING" },
                "newDate": { "type": "STRING" }
            },
            "required": ["taskId", "newDate"]
        }
    })
}

pub fn build_request(missed: &[Task], all_tasks: &[Task], today: NaiveDate) -> GenerateRequest {
    let missed_json: Vec<Value> = missed
        .iter()
        .map(|t| json!({ "taskId": t.id, "title": t.title, "priority": t.priority.as_str() }))
        .collect();
    let schedule_json: Vec<Value> = upcoming_context(missed, all_tasks, today)
        .into_iter()
        .map(|t| json!({ "title": t.title, "date": t.due_date }))
        .collect();

    let prompt = format!(
        "Today is {today}.
I have missed the following tasks: {missed}.
My current schedule for the next few days has these tasks: {schedule}.

Suggest new dates for the missed tasks, on or after today. Prioritize finding gaps. Do not schedule more than {cap} high priority tasks in one day.
Return a JSON array of objects containing {{ \"taskId\": \"original_id\", \"newDate\": \"YYYY-MM-DD\" }}.",
        today = format_due_date(today),
        missed = Value::Array(missed_json),
        schedule = Value::Array(schedule_json),
        cap = MAX_HIGH_PRIORITY_PER_DAY,
    );

    GenerateRequest::new().text(prompt).schema(response_schema())
}

/// New due dates for `missed`. Never adds or drops tasks.
pub async fn reschedule<M: GenerativeModel + ?Sized>(
    model: &M,
    connectivity: Connectivity,
    api_key: Option<&str>,
    missed: &[Task],
    all_tasks: &[Task],
    today: NaiveDate,
) -> RescheduleResult {
    let unchanged = || RescheduleResult {
        tasks: missed.to_vec(),
        source: RescheduleSource::Unchanged,
    };

    if missed.is_empty() {
        return unchanged();
    }
    if !connectivity.is_online() {
        tracing::info!("offline; reschedule skipped");
        return unchanged();
    }
    let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) else {
        tracing::info!("no API key configured; reschedule left dates unchanged");
        return unchanged();
    };

    match try_reschedule(model, api_key, missed, all_tasks, today).await {
        Ok(tasks) => RescheduleResult {
            tasks,
            source: RescheduleSource::Model,
        },
        Err(e) => {
            tracing::warn!(error = %e, "reschedule request failed; moving all missed tasks to tomorrow");
            RescheduleResult {
                tasks: move_all_to_tomorrow(missed, today),
                source: RescheduleSource::Fallback,
            }
        }
    }
}

async fn try_reschedule<M: GenerativeModel + ?Sized>(
    model: &M,
    api_key: &str,
    missed: &[Task],
    all_tasks: &[Task],
    today: NaiveDate,
) -> Result<Vec<Task>, AiError> {
    let request = build_request(missed, all_tasks, today);
    let raw = model
        .generate(api_key, &request)
        .await
        .map_err(|e| AiError::Reschedule(e.to_string()))?;
    let suggestions = parse_suggestions(&raw)?;
    Ok(apply_suggestions(missed, &suggestions, today))
}

/// `taskId -> newDate` from the model reply. An empty reply means no
/// suggestions; anything other than a JSON array is a failure.
pub fn parse_suggestions(raw: &str) -> Result<HashMap<String, String>, AiError> {
    let raw = raw.trim();
    let raw = if raw.is_empty() { "[]" } else { raw };

    let value: Value = serde_json::from_str(raw).map_err(|e| AiError::Reschedule(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(AiError::Reschedule("response was not a JSON array".into()));
    };

    let mut out = HashMap::new();
    for item in items {
        let task_id = item.get("taskId").and_then(Value::as_str);
        let new_date = item.get("newDate").and_then(Value::as_str);
        if let (Some(id), Some(date)) = (task_id, new_date) {
            // first suggestion per task wins
            out.entry(id.to_string()).or_insert_with(|| date.trim().to_string());
        }
    }
    Ok(out)
}

/// Apply suggestions per task; a task without a usable suggestion moves to
/// tomorrow on its own.
pub fn apply_suggestions(missed: &[Task], suggestions: &HashMap<String, String>, today: NaiveDate) -> Vec<Task> {
    let tomorrow = due_date_after(today, 1);
    missed
        .iter()
        .map(|t| {
            let mut t = t.clone();
            t.due_date = match suggestions.get(&t.id) {
                Some(d) if is_valid_due_date(d) => d.clone(),
                Some(d) => {
                    tracing::warn!(task_id = %t.id, date = %d, "ignoring malformed suggested date");
                    tomorrow.clone()
                }
                None => tomorrow.clone(),
            };
            t
        })
        .collect()
}

pub fn move_all_to_tomorrow(missed: &[Task], today: NaiveDate) -> Vec<Task> {
    let tomorrow = due_date_after(today, 1);
    missed
        .iter()
        .map(|t| Task {
            due_date: tomorrow.clone(),
            ..t.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyplan_core::Priority;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 10).unwrap()
    }

    fn t(id: &str, due: &str) -> Task {
        Task::new(id, format!("task {id}")).with_due_date(due)
    }

    #[test]
    fn context_is_upcoming_open_and_capped() {
        let mut all: Vec<Task> = (0..15).map(|i| t(&format!("u{i:02}"), &format!("2024-04-{:02}", 25 - i))).collect();
        all.push(t("old", "2024-04-01"));
        all.push(t("done", "2024-04-11").with_status(TaskStatus::Completed));
        let missed = vec![t("old", "2024-04-01")];

        let ctx = upcoming_context(&missed, &all, day());
        assert_eq!(ctx.len(), CONTEXT_LIMIT);
        assert_eq!(ctx[0].due_date, "2024-04-11");
        assert!(ctx.iter().all(|c| c.id != "old" && c.id != "done"));
        assert!(ctx.windows(2).all(|w| w[0].due_date <= w[1].due_date));
    }

    #[test]
    fn request_mentions_titles_and_cap() {
        let missed = vec![t("m1", "2024-04-01").with_priority(Priority::High)];
        let all = vec![missed[0].clone(), t("n1", "2024-04-12")];
        let prompt = build_request(&missed, &all, day()).prompt_text();
        assert!(prompt.contains("task m1"));
        assert!(prompt.contains(r#""date":"2024-04-12""#));
        assert!(prompt.contains("more than 3 high priority"));
        assert!(prompt.contains("Today is 2024-04-10"));
    }

    #[test]
    fn per_task_fallback_for_missing_or_bad_suggestions() {
        let missed = vec![t("a", "2024-04-01"), t("b", "2024-04-02"), t("c", "2024-04-03")];
        let suggestions = parse_suggestions(
            r#"[{"taskId":"a","newDate":"2024-04-13"},{"taskId":"c","newDate":"soon"},{"taskId":"zz","newDate":"2024-04-20"}]"#,
        )
        .unwrap();
        let out = apply_suggestions(&missed, &suggestions, day());

        let dates: Vec<_> = out.iter().map(|t| t.due_date.as_str()).collect();
        assert_eq!(dates, vec!["2024-04-13", "2024-04-11", "2024-04-11"]);
        let ids: Vec<_> = out.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn unparseable_reply_is_an_error() {
        assert!(parse_suggestions("not json").is_err());
        assert!(parse_suggestions(r#"{"taskId":"a"}"#).is_err());
        assert!(parse_suggestions("").unwrap().is_empty());
    }

    #[test]
    fn uniform_fallback_moves_everything() {
        let missed = vec![t("a", "2023-12-01"), t("b", "2024-04-09")];
        let out = move_all_to_tomorrow(&missed, day());
        assert!(out.iter().all(|t| t.due_date == "2024-04-11"));
        assert_eq!(out[0].status, TaskStatus::Todo);
    }
}
