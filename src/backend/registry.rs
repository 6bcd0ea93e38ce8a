//! Backend selection
//!
//! Maps the configured backend kind onto a concrete ModelBackend.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Error, Result};

use super::{MockBackend, OllamaBackend, OllamaConfig, OpenAiBackend, OpenAiConfig, SharedBackend};

// ─────────────────────────────────────────────────────────────────
// Backend Kind
// ─────────────────────────────────────────────────────────────────

/// Supported backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted OpenAI-compatible chat API
    #[default]
    Hosted,
    /// Local Ollama server
    Local,
    /// In-process mock (offline dry runs)
    Mock,
}

impl BackendKind {
    /// Get all backend kinds
    pub fn all() -> &'static [BackendKind] {
        &[BackendKind::Hosted, BackendKind::Local, BackendKind::Mock]
    }

    /// Get the backend name
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Hosted => "hosted",
            BackendKind::Local => "local",
            BackendKind::Mock => "mock",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hosted" | "openai" => Some(BackendKind::Hosted),
            "local" | "ollama" => Some(BackendKind::Local),
            "mock" => Some(BackendKind::Mock),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Backend Settings
// ─────────────────────────────────────────────────────────────────

/// Backend section of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BackendSettings {
    /// Which backend to use
    pub kind: BackendKind,

    /// Hosted chat API settings
    pub hosted: OpenAiConfig,

    /// Local server settings
    pub local: OllamaConfig,
}

// ─────────────────────────────────────────────────────────────────
// Backend Factory
// ─────────────────────────────────────────────────────────────────

/// Factory for creating backends
pub struct BackendFactory;

impl BackendFactory {
    /// Build the configured backend without touching the network
    pub fn create(settings: &BackendSettings) -> Result<SharedBackend> {
        let backend: SharedBackend = match settings.kind {
            BackendKind::Hosted => Arc::new(OpenAiBackend::new(settings.hosted.clone())?),
            BackendKind::Local => Arc::new(OllamaBackend::new(settings.local.clone())?),
            BackendKind::Mock => Arc::new(MockBackend::new()),
        };
        Ok(backend)
    }

    /// Build the configured backend and verify it is usable
    ///
    /// An unreachable local server is fatal here. The hosted API is not
    /// probed; a bad key surfaces as `AuthenticationFailed` on first use.
    pub async fn connect(settings: &BackendSettings) -> Result<SharedBackend> {
        let backend = Self::create(settings)?;

        if settings.kind == BackendKind::Local {
            let health = backend.health_check().await?;
            if !health.operational {
                let message = health
                    .error
                    .unwrap_or_else(|| "server did not respond".to_string());
                warn!(backend = %settings.kind, %message, "Backend unavailable");
                return Err(Error::backend_unavailable(settings.kind.name(), message));
            }
        }

        info!(backend = backend.name(), model = backend.model(), "Backend ready");
        Ok(backend)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!(BackendKind::from_str("hosted"), Some(BackendKind::Hosted));
        assert_eq!(BackendKind::from_str("OLLAMA"), Some(BackendKind::Local));
        assert_eq!(BackendKind::from_str("mock"), Some(BackendKind::Mock));
        assert_eq!(BackendKind::from_str("cuda"), None);
    }

    #[test]
    fn test_backend_kind_display() {
        for kind in BackendKind::all() {
            assert_eq!(BackendKind::from_str(&kind.to_string()), Some(*kind));
        }
    }

    #[test]
    fn test_create_mock() {
        let settings = BackendSettings {
            kind: BackendKind::Mock,
            ..Default::default()
        };
        let backend = BackendFactory::create(&settings).unwrap();
        assert_eq!(backend.name(), "mock");
    }

    #[test]
    fn test_create_hosted_without_key_fails() {
        let settings = BackendSettings::default();
        let err = BackendFactory::create(&settings).err().unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_connect_unreachable_local_is_fatal() {
        let settings = BackendSettings {
            kind: BackendKind::Local,
            local: OllamaConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                timeout_secs: 2,
                ..Default::default()
            },
            ..Default::default()
        };

        let err = BackendFactory::connect(&settings).await.err().unwrap();
        assert!(matches!(err, Error::BackendUnavailable { .. }));
    }
}
