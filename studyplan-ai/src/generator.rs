//! Syllabus → tasks via the generative model.

use chrono::NaiveDate;
use serde_json::{Value, json};
use studyplan_core::{Task, format_due_date};

use crate::client::{Connectivity, GenerateRequest, GenerativeModel, ImagePayload};
use crate::error::AiError;
use crate::validate::task_from_value;

pub const MISSING_KEY_MESSAGE: &str = "API key is missing. Set API_KEY or ai.api_key in ~/.studyplan/config.toml to use AI features.";

fn instruction(today: NaiveDate) -> String {
    format!(
        "You are an intelligent study planner assistant.
Analyze the provided syllabus (image or text) and extract a list of actionable study tasks, exams, and assignments.

Current Date: {today}

Rules:
1. Identify specific deliverables (Assignments, Exams) and their due dates.
2. Create \"Study Session\" tasks for major topics found in the syllabus. Schedule them a few days before the relevant exam or assignment if possible, otherwise spread them out starting from tomorrow.
3. If specific dates aren't mentioned (e.g., \"Week 5\"), estimate the date based on the Current Date assuming the semester started recently or is ongoing.
4. Return a JSON array.

Output Schema:
Array of objects with:
- title: string
- subject: string (Course name)
- dueDate: string (YYYY-MM-DD format)
- type: one of \"ASSIGNMENT\", \"EXAM\", \"STUDY_SESSION\"
- priority: \"high\" for exams, \"medium\" for assignments, \"low\" for study sessions.
- durationMinutes: number (estimate 60 for study, 120 for exams/assignments prep)",
        today = format_due_date(today)
    )
}

pub fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "subject": { "type": "STRING" },
                "dueDate": { "type": "STRING" },
                "type": { "type": "STRING", "enum": ["ASSIGNMENT", "EXAM", "STUDY_SESSION"] },
                "priority": { "type": "STRING", "enum": ["high", "medium", "low"] },
                "durationMinutes": { "type": "NUMBER" }
            },
            "required": ["title", "subject", "dueDate", "type", "priority"]
        }
    })
}

/// Build the request for a syllabus image and/or text.
pub fn build_request(image: Option<&ImagePayload>, text: Option<&str>, today: NaiveDate) -> GenerateRequest {
    let mut req = GenerateRequest::new()
        .text(instruction(today))
        .schema(response_schema());
    if let Some(img) = image {
        req = req.image(img.clone());
    }
    if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
        req = req.text(format!("Additional User Notes/Syllabus Text: {text}"));
    }
    req
}

/// Turn a syllabus into new TODO tasks. Does not touch the store.
///
/// Checks run before any network call: some input must be present, the
/// planner must be online, and an API key must be configured.
pub async fn generate_tasks<M: GenerativeModel + ?Sized>(
    model: &M,
    connectivity: Connectivity,
    api_key: Option<&str>,
    image: Option<&ImagePayload>,
    text: Option<&str>,
    today: NaiveDate,
) -> Result<Vec<Task>, AiError> {
    let image = image.filter(|i| !i.is_empty());
    let has_text = text.is_some_and(|t| !t.trim().is_empty());

    if !connectivity.is_online() {
        return Err(AiError::Precondition(
            "You are currently offline. Please connect to the internet to use AI features.".into(),
        ));
    }
    if image.is_none() && !has_text {
        return Err(AiError::Precondition(
            "Please provide a syllabus image or paste syllabus text.".into(),
        ));
    }
    let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) else {
        return Err(AiError::MissingCredential(MISSING_KEY_MESSAGE.into()));
    };

    let request = build_request(image, text, today);
    let raw = model
        .generate(api_key, &request)
        .await
        .map_err(|e| AiError::Generation(e.to_string()))?;

    parse_generated(&raw)
}

/// Parse model output. Empty output is an empty batch, not an error.
pub fn parse_generated(raw: &str) -> Result<Vec<Task>, AiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AiError::Generation(format!("response was not valid JSON: {e}")))?;
    let Value::Array(items) = value else {
        return Err(AiError::Generation("response was not a JSON array".into()));
    };

    let total = items.len();
    let mut tasks = Vec::with_capacity(total);
    for (i, item) in items.iter().enumerate() {
        match task_from_value(item) {
            Ok(t) => tasks.push(t),
            Err(e) => tracing::warn!(index = i, error = %e, "dropping invalid generated task"),
        }
    }

    if total > 0 && tasks.is_empty() {
        return Err(AiError::Generation(format!(
            "none of the {total} generated tasks were usable"
        )));
    }

    tracing::info!(generated = tasks.len(), dropped = total - tasks.len(), "syllabus parsed");
    Ok(tasks)
}
