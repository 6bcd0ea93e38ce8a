//! Structured model calls with retry and default-fill
//!
//! `StructuredCaller` never lets a transient backend error or a malformed
//! reply escape: after the retry budget is spent it returns a type-driven
//! default and marks the outcome as degraded. Only fatal errors propagate.

use backoff::{backoff::Backoff, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::{CompletionRequest, SharedBackend};
use crate::error::Result;

use super::extract::parse_json;
use super::schema::{placeholder_text, OutputSchema};

// ─────────────────────────────────────────────────────────────────
// Retry Policy
// ─────────────────────────────────────────────────────────────────

/// Retry settings for model calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt (ms)
    pub initial_delay_ms: u64,

    /// Upper bound for any delay (ms)
    pub max_delay_ms: u64,

    /// Delay growth factor; 1.0 gives a fixed delay
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 8000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy without delays between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            multiplier: 1.0,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        let initial = Duration::from_millis(self.initial_delay_ms);
        ExponentialBackoff {
            current_interval: initial,
            initial_interval: initial,
            randomization_factor: 0.0,
            multiplier: self.multiplier.max(1.0),
            max_interval: Duration::from_millis(self.max_delay_ms.max(self.initial_delay_ms)),
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Structured Caller
// ─────────────────────────────────────────────────────────────────

/// Result of a structured call
#[derive(Debug, Clone)]
pub struct CallOutcome {
    /// Parsed (or synthesized) value
    pub value: Value,

    /// Backend calls made
    pub attempts: u32,

    /// True when `value` is a default rather than model output
    pub degraded: bool,
}

/// Turns prompts into validated JSON values
#[derive(Clone)]
pub struct StructuredCaller {
    backend: SharedBackend,
    retry: RetryPolicy,
}

impl StructuredCaller {
    pub fn new(backend: SharedBackend, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run a call and return only the value
    pub async fn invoke(&self, prompt: &str, schema: Option<&OutputSchema>) -> Result<Value> {
        Ok(self.invoke_detailed(prompt, schema).await?.value)
    }

    /// Run a call, reporting attempts and whether the value was synthesized
    ///
    /// Without a schema the trimmed reply text is returned as a JSON string.
    pub async fn invoke_detailed(
        &self,
        prompt: &str,
        schema: Option<&OutputSchema>,
    ) -> Result<CallOutcome> {
        let request = match schema {
            Some(schema) => CompletionRequest::structured(
                format!("{}\n\nField meanings:\n{}", prompt, schema.describe()),
                schema.example_string(),
            ),
            None => CompletionRequest::text(prompt),
        };

        let max_attempts = self.retry.max_attempts.max(1);
        let mut backoff = self.retry.backoff();
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;

            match self.backend.complete(&request).await {
                Ok(response) => {
                    if let Some(value) = accept(&response.text, schema) {
                        debug!(attempt = attempts, "Structured call succeeded");
                        return Ok(CallOutcome {
                            value,
                            attempts,
                            degraded: false,
                        });
                    }
                    warn!(
                        attempt = attempts,
                        max_attempts,
                        chars = response.text.len(),
                        "Model reply unusable"
                    );
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) if e.is_retryable() => {
                    warn!(attempt = attempts, max_attempts, error = %e, "Model call failed");
                }
                Err(e) => {
                    warn!(attempt = attempts, error = %e, "Model call failed, not retrying");
                    break;
                }
            }

            if attempts < max_attempts {
                let delay = backoff
                    .next_backoff()
                    .unwrap_or_else(|| Duration::from_millis(self.retry.max_delay_ms));
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        warn!(attempts, "Retries exhausted, using default output");

        let value = match schema {
            Some(schema) => schema.default_value(),
            None => Value::String(placeholder_text("response")),
        };

        Ok(CallOutcome {
            value,
            attempts,
            degraded: true,
        })
    }
}

/// Validate one reply; `None` means retry
fn accept(text: &str, schema: Option<&OutputSchema>) -> Option<Value> {
    match schema {
        None => {
            let text = text.trim();
            (!text.is_empty()).then(|| Value::String(text.to_string()))
        }
        Some(schema) => {
            let parsed = parse_json(text)?;
            let repaired = schema.fill_missing(parsed);

            if !schema.is_empty() && repaired.top_level_filled() >= schema.fields().len() {
                return None;
            }
            if !repaired.filled.is_empty() {
                debug!(fields = ?repaired.filled, "Default-filled missing fields");
            }
            Some(repaired.value)
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
