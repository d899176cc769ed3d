//! Writing assistant for the admin forms: a prompt goes to a hosted Gemini
//! model and the reply comes back as plain text.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;

use crate::config::AiSettings;

#[derive(Debug)]
pub enum AiError {
    NotConfigured,
    Request(String),
    Rejected { status: u16, body: String },
    EmptyResponse,
}

impl fmt::Display for AiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AiError::NotConfigured => write!(f, "text generation is not configured"),
            AiError::Request(msg) => write!(f, "request to model failed: {}", msg),
            AiError::Rejected { status, body } => {
                write!(f, "model rejected the request ({}): {}", status, body)
            }
            AiError::EmptyResponse => write!(f, "model returned no text"),
        }
    }
}

impl std::error::Error for AiError {}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Request(err.to_string())
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize, Debug)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|part| part.text).collect();
        Some(text).filter(|t| !t.trim().is_empty())
    }
}

/// Gemini `generateContent` client.
pub struct GeminiGenerator {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(settings: &AiSettings) -> Self {
        Self {
            client: Client::new(),
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    #[tracing::instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let request_body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 1,
                "topP": 0.95,
                "topK": 40,
                "maxOutputTokens": 8192,
                "responseMimeType": "text/plain",
            },
            "safetySettings": [
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_LOW_AND_ABOVE" },
                { "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": "BLOCK_LOW_AND_ABOVE" },
            ],
        });

        let full_url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        );
        tracing::debug!("Calling model API: {}", full_url);

        let response = self
            .client
            .post(&full_url)
            .header("x-goog-api-key", &self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(Duration::from_secs(90))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            tracing::error!("Model API error: Status {}, Body: {}", status, body);
            return Err(AiError::Rejected { status, body });
        }

        let parsed = response.json::<GenerateResponse>().await?;
        parsed.text().ok_or(AiError::EmptyResponse)
    }
}

/// Used when no API key is configured; every request fails.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, AiError> {
        tracing::error!("Missing GEMINI_API_KEY in environment variables.");
        Err(AiError::NotConfigured)
    }
}

/// Trims the reply and drops code fences.
pub fn clean_reply(text: &str) -> String {
    text.replace("```", "").trim().to_string()
}

/// Form-ready prose: additionally strips wrapping single quotes and the
/// `*` and `#` markdown markers.
pub fn plain_prose(text: &str) -> String {
    let text = clean_reply(text);
    let text = text.strip_prefix('\'').unwrap_or(&text);
    let text = text.strip_suffix('\'').unwrap_or(text);
    text.chars().filter(|c| !matches!(c, '*' | '#')).collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_removed() {
        assert_eq!(clean_reply("```json\n[\"rust\"]\n```\n"), "json\n[\"rust\"]");
        assert_eq!(clean_reply("  plain  "), "plain");
    }

    #[test]
    fn prose_drops_markdown_markers() {
        assert_eq!(plain_prose("'## About **Acme**'"), "About Acme");
        assert_eq!(plain_prose("It's *great*"), "It's great");
    }

    #[test]
    fn reply_text_joins_parts_of_first_candidate() {
        let parsed: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn blocked_reply_has_no_text() {
        let parsed: GenerateResponse =
            serde_json::from_value(json!({ "candidates": [{ "finishReason": "SAFETY" }] })).unwrap();
        assert_eq!(parsed.text(), None);
        let empty: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.text(), None);
    }
}
