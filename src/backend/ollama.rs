//! Local Ollama backend
//!
//! Talks to a locally running Ollama server through its native API:
//! `POST {base_url}/api/generate` for completions and `GET {base_url}/api/tags`
//! for the health check and model listing.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::openai::status_error;
use super::{transport_error, BackendHealth, CompletionRequest, CompletionResponse, ModelBackend};

/// Default Ollama server URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default local model
pub const DEFAULT_MODEL: &str = "llama3.1";

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

/// Configuration for the local backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Server base URL, without the `/api` suffix
    pub base_url: String,

    /// Model name as known to the server
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 300,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// API Types
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

// ─────────────────────────────────────────────────────────────────
// Ollama Backend
// ─────────────────────────────────────────────────────────────────

/// Local generate-API backend
pub struct OllamaBackend {
    config: OllamaConfig,
    client: Client,
}

impl OllamaBackend {
    /// Create a new backend (no network traffic until first use)
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(base_url = %config.base_url, model = %config.model, "Local backend created");

        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let base = base.strip_suffix("/api").unwrap_or(base);
        format!("{}/api/{}", base, path)
    }

    /// Models installed on the server
    pub async fn available_models(&self) -> Result<Vec<String>> {
        let url = self.endpoint("tags");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::parse_failed(format!("Invalid tags body: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        match self.available_models().await {
            Ok(models) => {
                let wanted = &self.config.model;
                let installed = models
                    .iter()
                    .any(|m| m == wanted || m.split(':').next() == Some(wanted.as_str()));
                if !installed {
                    warn!(model = %wanted, "Model not listed by the local server; run 'ollama pull'");
                }
                Ok(BackendHealth::ok(wanted))
            }
            Err(e) => Ok(BackendHealth {
                operational: false,
                model: self.config.model.clone(),
                error: Some(e.to_string()),
            }),
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let url = self.endpoint("generate");
        let prompt = request.rendered_prompt();
        let body = GenerateRequest {
            model: &self.config.model,
            prompt: &prompt,
            stream: false,
        };

        debug!(model = %self.config.model, chars = prompt.len(), "Sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::parse_failed(format!("Invalid generate body: {}", e)))?;

        Ok(CompletionResponse {
            text: parsed.response,
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
