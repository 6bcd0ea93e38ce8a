//! Mock backend for testing
//!
//! Deterministic ModelBackend used by the test suite and for offline dry runs.
//! Replies are resolved in this order: scripted queue, first matching prompt
//! rule, global failure, fixed response, then the default echo (the format
//! hint for structured requests, a canned sentence otherwise).

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{Error, Result};

use super::{BackendHealth, CompletionRequest, CompletionResponse, ModelBackend};

// ─────────────────────────────────────────────────────────────────
// Mock Behaviour
// ─────────────────────────────────────────────────────────────────

/// Injected failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Endpoint unreachable (transient)
    Connection,
    /// Request timed out (transient)
    Timeout,
    /// Non-success HTTP status
    Status(u16),
    /// Credentials rejected (fatal)
    Auth,
}

impl MockFailure {
    fn into_error(self) -> Error {
        match self {
            MockFailure::Connection => Error::connection_failed("mock://", "connection refused"),
            MockFailure::Timeout => Error::RequestTimeout {
                url: "mock://".to_string(),
            },
            MockFailure::Status(status) => Error::BackendStatus {
                status,
                body: "mock failure".to_string(),
            },
            MockFailure::Auth => Error::AuthenticationFailed {
                message: "mock credentials rejected".to_string(),
            },
        }
    }
}

/// A single canned reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Return this text
    Text(String),
    /// Fail with this error
    Fail(MockFailure),
    /// Wait, then resolve the inner reply
    Delayed(u64, Box<MockReply>),
}

impl MockReply {
    /// Shorthand for a text reply
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }
}

/// Configuration for mock backend behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Simulated latency for every call (ms)
    pub latency_ms: u64,

    /// Fail every call not handled by a script entry or rule
    pub fail_all: Option<MockFailure>,

    /// Fixed response text (for deterministic testing)
    pub fixed_response: Option<String>,

    /// Report the backend as unreachable from `health_check`
    pub unhealthy: bool,
}

// ─────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────

/// Mock implementation of ModelBackend
pub struct MockBackend {
    config: MockConfig,
    rules: Vec<(String, MockReply)>,
    script: Mutex<VecDeque<MockReply>>,
    prompts: RwLock<Vec<String>>,
}

impl MockBackend {
    /// Create a new mock backend with default configuration
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create a new mock backend with custom configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            rules: Vec::new(),
            script: Mutex::new(VecDeque::new()),
            prompts: RwLock::new(Vec::new()),
        }
    }

    /// Always answer with `text`
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_config(MockConfig {
            fixed_response: Some(text.into()),
            ..Default::default()
        })
    }

    /// Reply with `reply` whenever the prompt contains `pattern`
    pub fn with_rule(mut self, pattern: impl Into<String>, reply: MockReply) -> Self {
        self.rules.push((pattern.into(), reply));
        self
    }

    /// Queue replies consumed one per call, ahead of every rule
    pub fn with_script(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.script.lock().extend(replies);
        self
    }

    /// Total number of completion calls
    pub fn call_count(&self) -> usize {
        self.prompts.read().len()
    }

    /// Number of calls whose prompt contained `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.prompts
            .read()
            .iter()
            .filter(|p| p.contains(pattern))
            .count()
    }

    /// Every prompt seen so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().clone()
    }

    /// Reset recorded calls
    pub fn reset_counts(&self) {
        self.prompts.write().clear();
    }

    fn pick_reply(&self, request: &CompletionRequest) -> MockReply {
        if let Some(reply) = self.script.lock().pop_front() {
            return reply;
        }

        if let Some((_, reply)) = self
            .rules
            .iter()
            .find(|(pattern, _)| request.prompt.contains(pattern.as_str()))
        {
            return reply.clone();
        }

        if let Some(failure) = self.config.fail_all {
            return MockReply::Fail(failure);
        }

        if let Some(ref fixed) = self.config.fixed_response {
            return MockReply::Text(fixed.clone());
        }

        match &request.format_hint {
            Some(hint) => MockReply::Text(hint.clone()),
            None => {
                let head: String = request.prompt.chars().take(60).collect();
                MockReply::Text(format!("Mock analysis: {}", head.trim()))
            }
        }
    }

    async fn resolve(&self, mut reply: MockReply) -> Result<String> {
        loop {
            match reply {
                MockReply::Text(text) => return Ok(text),
                MockReply::Fail(failure) => return Err(failure.into_error()),
                MockReply::Delayed(ms, inner) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    reply = *inner;
                }
            }
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn health_check(&self) -> Result<BackendHealth> {
        if self.config.unhealthy {
            return Ok(BackendHealth {
                operational: false,
                model: self.model().to_string(),
                error: Some("mock backend marked unhealthy".to_string()),
            });
        }
        Ok(BackendHealth::ok(self.model()))
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        self.prompts.write().push(request.prompt.clone());

        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }

        let reply = self.pick_reply(request);
        let text = self.resolve(reply).await?;

        Ok(CompletionResponse {
            text,
            model: self.model().to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_echoes_format_hint() {
        let backend = MockBackend::new();
        let req = CompletionRequest::structured("rate", r#"{"score": 0.5}"#);

        let resp = backend.complete(&req).await.unwrap();
        assert_eq!(resp.text, r#"{"score": 0.5}"#);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_free_text_default() {
        let backend = MockBackend::new();
        let resp = backend
            .complete(&CompletionRequest::text("Analyze the market"))
            .await
            .unwrap();
        assert!(resp.text.starts_with("Mock analysis"));
    }

    #[tokio::test]
    async fn test_script_then_rules() {
        let backend = MockBackend::new()
            .with_rule("market", MockReply::text("rule hit"))
            .with_script(vec![MockReply::text("first")]);

        let req = CompletionRequest::text("market question");
        assert_eq!(backend.complete(&req).await.unwrap().text, "first");
        assert_eq!(backend.complete(&req).await.unwrap().text, "rule hit");
        assert_eq!(backend.calls_matching("market"), 2);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MockBackend::new().with_rule("boom", MockReply::Fail(MockFailure::Status(503)));

        let err = backend
            .complete(&CompletionRequest::text("boom"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        let ok = backend.complete(&CompletionRequest::text("fine")).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_fixed_response_and_reset() {
        let backend = MockBackend::fixed("hello");
        let resp = backend
            .complete(&CompletionRequest::structured("x", "{}"))
            .await
            .unwrap();
        assert_eq!(resp.text, "hello");

        backend.reset_counts();
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unhealthy_flag() {
        let backend = MockBackend::with_config(MockConfig {
            unhealthy: true,
            ..Default::default()
        });
        let health = backend.health_check().await.unwrap();
        assert!(!health.operational);
    }
}
