//! Gemini `generateContent` backend.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};

use crate::error::{ExecutionError, PulseError, PulseResult};

use super::TextGenerator;

/// Default API host.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
/// Default model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

fn failed(reason: impl Into<String>) -> PulseError {
    ExecutionError::TextGeneration { reason: reason.into() }.into()
}

/// Text generation through the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Client for `model` at the default endpoint. Without a key every call
    /// fails with `ExecutionError::Unconfigured`.
    #[must_use]
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Overrides the API host (or a full `:generateContent` URL).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// True when an API key is present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self, api_key: &str) -> PulseResult<Url> {
        let mut url = if self.endpoint.contains(":generateContent") {
            Url::parse(&self.endpoint).map_err(|e| failed(format!("invalid endpoint {}: {e}", self.endpoint)))?
        } else {
            let generated = format!(
                "{}/v1beta/models/{}:generateContent",
                self.endpoint.trim_end_matches('/'),
                self.model
            );
            Url::parse(&generated).map_err(|e| failed(format!("invalid endpoint {generated}: {e}")))?
        };
        if !url.query_pairs().any(|(k, _)| k == "key") {
            url.query_pairs_mut().append_pair("key", api_key);
        }
        Ok(url)
    }
}

/// Concatenated text parts of the first candidate.
fn candidate_text(body: &Value) -> Option<String> {
    let parts = body["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate["content"]["parts"].as_array())?;
    let text = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> PulseResult<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| ExecutionError::Unconfigured {
            reason: "GEMINI_API_KEY is not set".to_string(),
        })?;
        let url = self.url(api_key)?;
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| failed(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(320).collect();
            return Err(failed(format!("gemini error {status}: {snippet}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| failed(format!("invalid response: {e}")))?;
        candidate_text(&body).ok_or_else(|| failed("response carried no text"))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("configured", &self.is_configured())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_targets_model_and_appends_key() {
        let client = GeminiClient::new(Some("k".to_string()), DEFAULT_GEMINI_MODEL);
        let url = client.url("k").unwrap();
        assert_eq!(url.path(), "/v1beta/models/gemini-2.5-flash:generateContent");
        assert_eq!(url.query(), Some("key=k"));
    }

    #[test]
    fn full_url_endpoint_is_kept() {
        let client = GeminiClient::new(Some("k".to_string()), "ignored")
            .with_endpoint("http://localhost:9000/custom:generateContent?key=preset");
        let url = client.url("k").unwrap();
        assert_eq!(url.query(), Some("key=preset"));
    }

    #[test]
    fn first_candidate_parts_are_joined() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": " Restock store_2. " }, { "text": "Reroute via hub B." }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(candidate_text(&body).as_deref(), Some("Restock store_2. \nReroute via hub B."));
        assert_eq!(candidate_text(&json!({ "candidates": [] })), None);
    }

    #[tokio::test]
    async fn missing_key_is_unconfigured() {
        let client = GeminiClient::new(Some("  ".to_string()), DEFAULT_GEMINI_MODEL);
        assert!(!client.is_configured());
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, PulseError::Execution(ExecutionError::Unconfigured { .. })));
    }
}
