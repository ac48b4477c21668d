//! Gemini API client for text generation.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// A model that turns a prompt into a text completion.
pub trait TextModel {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, GeminiError>> + Send;
}

#[derive(Debug)]
pub enum GeminiError {
    Http(String),
    Api { status: u16, message: String },
    Parse(String),
    /// The prompt was refused by the safety filter.
    Blocked(String),
    Empty,
}

impl std::fmt::Display for GeminiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeminiError::Http(e) => write!(f, "HTTP error: {e}"),
            GeminiError::Api { status, message } => write!(f, "API error {status}: {message}"),
            GeminiError::Parse(e) => write!(f, "Failed to parse response: {e}"),
            GeminiError::Blocked(reason) => write!(f, "Prompt blocked: {reason}"),
            GeminiError::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for GeminiError {}

pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self, GeminiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| GeminiError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { api_key, model, client })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a text completion for a single prompt.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GeminiError::Http(format!("Failed to read response: {}", e.without_url())))?;

        debug!("Gemini response status: {status}");

        if !status.is_success() {
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = parse_response(&body)?;
        info!("🧠 Gemini replied ({} chars)", text.chars().count());
        Ok(text)
    }
}

impl TextModel for GeminiClient {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, GeminiError>> + Send {
        self.generate_text(prompt)
    }
}

/// Extract the text of the first candidate from a generateContent body.
fn parse_response(body: &str) -> Result<String, GeminiError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GeminiError::Parse(e.to_string()))?;

    if let Some(error) = parsed.error {
        return Err(GeminiError::Api {
            status: 200,
            message: error.message,
        });
    }

    let candidates = parsed.candidates.unwrap_or_default();
    let Some(candidate) = candidates.first() else {
        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GeminiError::Blocked(reason));
        }
        return Err(GeminiError::Empty);
    };

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GeminiError::Empty);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "📝 REVIEW:\n"}, {"text": "Correct"}], "role": "model"},
                "finishReason": "STOP"
            }]
        }"#;
        assert_eq!(parse_response(body).unwrap(), "📝 REVIEW:\nCorrect");
    }

    #[test]
    fn test_parse_uses_first_candidate() {
        let body = r#"{"candidates": [
            {"content": {"parts": [{"text": "first"}]}},
            {"content": {"parts": [{"text": "second"}]}}
        ]}"#;
        assert_eq!(parse_response(body).unwrap(), "first");
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, GeminiError::Api { .. }));
        assert!(err.to_string().contains("API key not valid"));
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, GeminiError::Blocked(ref r) if r == "SAFETY"));
    }

    #[test]
    fn test_parse_empty_candidates() {
        assert!(matches!(parse_response(r#"{"candidates": []}"#), Err(GeminiError::Empty)));
        assert!(matches!(
            parse_response(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#),
            Err(GeminiError::Empty)
        ));
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(parse_response("<html>"), Err(GeminiError::Parse(_))));
    }
}
