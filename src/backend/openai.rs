//! OpenAI-compatible chat API backend
//!
//! Implements ModelBackend by calling `{base_url}/chat/completions` on any
//! OpenAI-compatible endpoint. Structured requests switch the API into JSON
//! response mode.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::{transport_error, BackendHealth, CompletionRequest, CompletionResponse, ModelBackend};

/// System message sent ahead of every prompt
const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that evaluates product ideas from a specific expert perspective.";

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for the hosted chat API backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL (e.g., "https://api.openai.com/v1")
    pub base_url: String,

    /// API key (required for the hosted backend)
    pub api_key: String,

    /// Model to use (e.g., "gpt-4o")
    pub model: String,

    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o".to_string(),
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Backend
// ─────────────────────────────────────────────────────────────────

/// Hosted chat-completions backend
pub struct OpenAiBackend {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiBackend {
    /// Create a new backend; fails when no API key is configured
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::AuthenticationFailed {
                message: "no API key configured for the hosted backend".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %config.base_url,
            model = %config.model,
            "Hosted backend created"
        );

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }

    fn build_body<'a>(&'a self, prompt: &'a str, json_mode: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

/// Map a non-success HTTP status to the backend error taxonomy
pub(super) fn status_error(status: StatusCode, body: String) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::AuthenticationFailed {
            message: format!("API returned {}: {}", status, body),
        },
        _ => Error::BackendStatus {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "hosted"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        let url = self.endpoint("models");

        match self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => Ok(BackendHealth::ok(&self.config.model)),
            Ok(resp) => Ok(BackendHealth {
                operational: false,
                model: self.config.model.clone(),
                error: Some(format!("API returned status {}", resp.status())),
            }),
            Err(e) => Ok(BackendHealth {
                operational: false,
                model: self.config.model.clone(),
                error: Some(format!("Connection failed: {}", e)),
            }),
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = self.endpoint("chat/completions");
        let prompt = request.rendered_prompt();
        let body = self.build_body(&prompt, request.wants_json());

        debug!(model = %self.config.model, json = request.wants_json(), "Sending chat completion");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::parse_failed(format!("Invalid chat completion body: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::parse_failed("No choices in API response"))?;

        Ok(CompletionResponse {
            text,
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
