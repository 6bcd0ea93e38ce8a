//! Backend trait definitions
//!
//! Defines the core ModelBackend trait that every text-generation backend
//! implements. The structured-call layer only ever talks to this trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

// ─────────────────────────────────────────────────────────────────
// Backend Health & Status
// ─────────────────────────────────────────────────────────────────

/// Health status of a backend
#[derive(Debug, Clone)]
pub struct BackendHealth {
    /// Whether the backend can serve requests
    pub operational: bool,

    /// Model the backend will use
    pub model: String,

    /// Any error message
    pub error: Option<String>,
}

impl BackendHealth {
    /// Healthy status for the given model
    pub fn ok(model: impl Into<String>) -> Self {
        Self {
            operational: true,
            model: model.into(),
            error: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Requests & Responses
// ─────────────────────────────────────────────────────────────────

/// A single text-generation request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Full prompt text
    pub prompt: String,

    /// JSON example of the expected output, when a structured answer is wanted
    pub format_hint: Option<String>,
}

impl CompletionRequest {
    /// Free-text request
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format_hint: None,
        }
    }

    /// Request that asks for JSON shaped like `hint`
    pub fn structured(prompt: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format_hint: Some(hint.into()),
        }
    }

    /// Whether the backend should switch to a JSON response mode
    pub fn wants_json(&self) -> bool {
        self.format_hint.is_some()
    }

    /// Prompt with the format instructions appended
    pub fn rendered_prompt(&self) -> String {
        match &self.format_hint {
            Some(hint) => format!(
                "{}\n\nRespond with a single JSON object matching this format exactly:\n{}",
                self.prompt, hint
            ),
            None => self.prompt.clone(),
        }
    }
}

/// Raw text produced by a backend
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,

    /// Model that produced it
    pub model: String,
}

// ─────────────────────────────────────────────────────────────────
// ModelBackend Trait
// ─────────────────────────────────────────────────────────────────

/// Core trait for text-generation backends
///
/// Implemented by the hosted chat API, the local generate API and the mock.
/// The trait is object-safe for dynamic dispatch.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Backend name (e.g., "hosted", "local", "mock")
    fn name(&self) -> &'static str;

    /// Model identifier sent with every request
    fn model(&self) -> &str;

    /// Check that the backend can be reached
    async fn health_check(&self) -> Result<BackendHealth>;

    /// Generate text for a single prompt
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}

/// Type alias for a shared backend reference
pub type SharedBackend = Arc<dyn ModelBackend>;

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_request_has_no_hint() {
        let req = CompletionRequest::text("hello");
        assert!(!req.wants_json());
        assert_eq!(req.rendered_prompt(), "hello");
    }

    #[test]
    fn test_structured_request_appends_format() {
        let req = CompletionRequest::structured("rate it", r#"{"score": 0.0}"#);
        assert!(req.wants_json());

        let rendered = req.rendered_prompt();
        assert!(rendered.starts_with("rate it"));
        assert!(rendered.contains(r#"{"score": 0.0}"#));
    }

    #[test]
    fn test_health_ok() {
        let health = BackendHealth::ok("gpt-4o");
        assert!(health.operational);
        assert!(health.error.is_none());
    }
}
