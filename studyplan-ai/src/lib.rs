//! studyplan-ai: syllabus parsing and overdue rescheduling through a
//! generative model (Gemini `generateContent`).

pub mod client;
pub mod error;
pub mod generator;
pub mod rescheduler;
pub mod validate;

pub use client::{Connectivity, GeminiClient, GenerateRequest, GenerativeModel, ImagePayload, Part};
pub use error::{AiError, ValidationError};
pub use generator::generate_tasks;
pub use rescheduler::{RescheduleResult, RescheduleSource, reschedule};
