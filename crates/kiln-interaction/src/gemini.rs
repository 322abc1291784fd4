//! GeminiApiClient - Direct REST client for the Gemini `generateContent` endpoint.

use async_trait::async_trait;
use kiln_core::GenerationError;
use kiln_core::config::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, GeminiSettings};
use kiln_core::task_mode::SamplingConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::generator::{CompletionRequest, TextGenerator};

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

const SAFETY_FINISH_REASON: &str = "SAFETY";

/// Generator backed by the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiApiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiApiClient {
    /// Creates a client for the public endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    /// Creates a client from `[gemini]` settings.
    pub fn from_settings(api_key: impl Into<String>, settings: &GeminiSettings) -> Self {
        let model = if settings.model.trim().is_empty() {
            DEFAULT_GEMINI_MODEL
        } else {
            settings.model.as_str()
        };
        Self::new(api_key, model).with_base_url(&settings.base_url)
    }

    /// Overrides the endpoint root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, GenerationError> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            model = self.model,
            api_key = self.api_key
        );

        // URLs are stripped from reqwest errors: the query string carries the key.
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| GenerationError::Network(err.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::Decode(err.without_url().to_string()))?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl TextGenerator for GeminiApiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let body = GenerateContentRequest::new(request.prompt, request.sampling);
        tracing::debug!(
            "[Gemini] generateContent model={} temperature={}",
            self.model,
            body.generation_config.temperature
        );
        self.send_request(&body).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: SamplingConfig,
    safety_settings: Vec<SafetySetting>,
}

impl GenerateContentRequest {
    fn new(prompt: String, sampling: SamplingConfig) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: prompt }],
            }],
            generation_config: sampling,
            safety_settings: HARM_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, GenerationError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(GenerationError::SafetyBlocked { reason });
    }

    let candidate = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .ok_or(GenerationError::EmptyCompletion)?;

    if candidate.finish_reason.as_deref() == Some(SAFETY_FINISH_REASON) {
        return Err(GenerationError::SafetyBlocked {
            reason: SAFETY_FINISH_REASON.to_string(),
        });
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(GenerationError::EmptyCompletion)
    } else {
        Ok(text)
    }
}

fn map_http_error(status: StatusCode, body: String) -> GenerationError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    GenerationError::Http {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<String, GenerationError> {
        extract_text_response(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_text_parts_are_joined() {
        let text = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world"}]}}]
        }))
        .unwrap();
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_safety_finish_reason() {
        let err = parse(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap_err();
        assert!(err.is_safety_blocked());
    }

    #[test]
    fn test_prompt_block_reason() {
        let err = parse(json!({
            "promptFeedback": {"blockReason": "OTHER"}
        }))
        .unwrap_err();
        assert_eq!(
            err,
            GenerationError::SafetyBlocked {
                reason: "OTHER".into()
            }
        );
    }

    #[test]
    fn test_empty_completion() {
        assert_eq!(
            parse(json!({"candidates": []})).unwrap_err(),
            GenerationError::EmptyCompletion
        );
        assert_eq!(
            parse(json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]})).unwrap_err(),
            GenerationError::EmptyCompletion
        );
    }

    #[test]
    fn test_http_error_body_is_unwrapped() {
        let err = map_http_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#
                .to_string(),
        );
        assert_eq!(
            err,
            GenerationError::Http {
                status: 400,
                message: "INVALID_ARGUMENT: API key not valid".into()
            }
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateContentRequest::new("hi".into(), SamplingConfig::default());
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(value["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(value["safetySettings"][0]["threshold"], "BLOCK_NONE");
    }

    #[test]
    fn test_debug_hides_key() {
        let client = GeminiApiClient::new("secret-key", "gemini-2.5-flash");
        assert!(!format!("{client:?}").contains("secret-key"));
    }
}
