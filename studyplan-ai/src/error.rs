use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    /// Nothing to send, or offline. Raised before any network call.
    #[error("{0}")]
    Precondition(String),

    /// No API key configured. Raised before any network call.
    #[error("{0}")]
    MissingCredential(String),

    /// Task generation failed; shown to the user, not retried.
    #[error("could not generate tasks: {0}")]
    Generation(String),

    /// Reschedule request failed. Never shown; callers fall back to tomorrow.
    #[error("reschedule failed: {0}")]
    Reschedule(String),

    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model API error: {status} {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("element is not an object")]
    NotAnObject,
    #[error("missing or blank field '{0}'")]
    MissingField(&'static str),
    #[error("invalid due date '{0}'")]
    InvalidDate(String),
}
