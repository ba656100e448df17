//! Generative-model transport: request shape, the model trait and the Gemini
//! `generateContent` client.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;

use crate::error::AiError;

/// Online/offline signal. Offline is a hard precondition failure for both
/// AI operations, whatever the transport would report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn from_online(online: bool) -> Self {
        if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }

    pub fn is_online(self) -> bool {
        self == Connectivity::Online
    }
}

/// Raw image bytes plus MIME type, sent inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// MIME type from a file extension; PNG when unknown.
    pub fn mime_for_path(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            Some("heic") => "image/heic",
            _ => "image/png",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Image(ImagePayload),
}

/// One generation request: ordered parts plus an optional JSON response schema.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub parts: Vec<Part>,
    pub response_schema: Option<Value>,
}

impl GenerateRequest {
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            response_schema: None,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text(text.into()));
        self
    }

    pub fn image(mut self, image: ImagePayload) -> Self {
        self.parts.push(Part::Image(image));
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// All text parts joined, for logging and tests.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Gemini REST body.
    pub fn to_gemini_body(&self) -> Value {
        let parts: Vec<Value> = self
            .parts
            .iter()
            .map(|p| match p {
                Part::Text(t) => json!({ "text": t }),
                Part::Image(img) => json!({
                    "inlineData": { "mimeType": img.mime_type, "data": img.to_base64() }
                }),
            })
            .collect();

        let mut generation_config = json!({ "responseMimeType": "application/json" });
        if let Some(schema) = &self.response_schema {
            generation_config["responseSchema"] = schema.clone();
        }

        json!({
            "contents": [{ "parts": parts }],
            "generationConfig": generation_config,
        })
    }
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// A model that turns a request into response text (expected to be JSON).
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<String, AiError>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, AiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, api_key: &str, request: &GenerateRequest) -> Result<String, AiError> {
        let url = self.endpoint();
        tracing::debug!(%url, parts = request.parts.len(), "sending generateContent request");

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request.to_gemini_body())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let out: GeminiResponse = resp.json().await?;
        let mut s = String::new();
        if let Some(content) = out.candidates.into_iter().next().and_then(|c| c.content) {
            for p in content.parts {
                if let Some(t) = p.text {
                    s.push_str(&t);
                }
            }
        }
        Ok(s.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_body_has_inline_image_and_schema() {
        let req = GenerateRequest::new()
            .text("extract tasks")
            .image(ImagePayload::new("image/png", vec![1, 2, 3]))
            .schema(json!({ "type": "ARRAY" }));
        let body = req.to_gemini_body();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "extract tasks");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }

    #[test]
    fn body_without_schema_omits_it() {
        let body = GenerateRequest::new().text("hi").to_gemini_body();
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(ImagePayload::mime_for_path(Path::new("a/syllabus.JPG")), "image/jpeg");
        assert_eq!(ImagePayload::mime_for_path(Path::new("scan.webp")), "image/webp");
        assert_eq!(ImagePayload::mime_for_path(Path::new("noext")), "image/png");
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let c = GeminiClient::new(
            "https://generativelanguage.googleapis.com/",
            "gemini-3-flash-preview",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            c.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }
}
