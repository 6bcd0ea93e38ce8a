//! Configuration system for idea-council
//!
//! Sources, highest precedence first:
//! 1. CLI arguments
//! 2. Environment variables (IDEA_COUNCIL_* prefix, plus OPENAI_API_KEY)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend::{BackendKind, BackendSettings};
use crate::error::{Error, Result};
use crate::orchestrator::OrchestratorOptions;
use crate::structured::RetryPolicy;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "IDEA_COUNCIL_";

/// Credential fallback when no key is configured
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Model backend selection and endpoints
    pub backend: BackendSettings,

    /// Structured-call retry policy
    pub retry: RetryPolicy,

    /// Evaluation run settings
    pub evaluation: EvaluationSettings,

    /// Logging configuration
    pub logging: LoggingSettings,

    /// Persisted state locations
    pub storage: StorageSettings,
}

/// Evaluation run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// Wall-clock bound for a run in seconds (0 = unbounded)
    pub deadline_secs: u64,

    /// Number of recommendations when not taken from the advisor
    pub recommendation_count: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// Storage path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Persona enabled/priority settings document
    pub persona_state_file: String,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            deadline_secs: 0,
            recommendation_count: 5,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            persona_state_file: "~/.idea-council/personas.json".to_string(),
        }
    }
}

impl EvaluationSettings {
    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs))
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            deadline: self.deadline(),
            recommendation_count: self.recommendation_count,
        }
    }
}

impl AppConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_unchecked_credentials(config_path)?;
        config.check_credentials()?;
        Ok(config)
    }

    /// Like `load`, but without requiring backend credentials
    ///
    /// For commands that never talk to a model.
    pub fn load_unchecked_credentials(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate_settings()?;

        Ok(config)
    }

    /// Standard search locations, in order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("idea-council.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("idea-council").join("config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".idea-council").join("config.toml"));
        }
        paths
    }

    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        for path in Self::search_paths() {
            if path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Backend selection
        if let Some(val) = env_var("BACKEND") {
            if let Some(kind) = BackendKind::from_str(&val) {
                self.backend.kind = kind;
            }
        }

        // Hosted backend
        if let Some(val) = env_var("API_KEY") {
            self.backend.hosted.api_key = val;
        }
        if let Some(val) = env_var("API_BASE_URL") {
            self.backend.hosted.base_url = val;
        }
        if let Some(val) = env_var("MODEL") {
            self.backend.hosted.model = val;
        }
        if let Some(n) = env_parse("TEMPERATURE") {
            self.backend.hosted.temperature = n;
        }
        if let Some(n) = env_parse("TIMEOUT_SECS") {
            self.backend.hosted.timeout_secs = n;
        }
        if self.backend.hosted.api_key.is_empty() {
            if let Ok(val) = std::env::var(OPENAI_KEY_VAR) {
                self.backend.hosted.api_key = val;
            }
        }

        // Local backend
        if let Some(val) = env_var("OLLAMA_URL") {
            self.backend.local.base_url = val;
        }
        if let Some(val) = env_var("OLLAMA_MODEL") {
            self.backend.local.model = val;
        }

        // Retry and evaluation
        if let Some(n) = env_parse("MAX_ATTEMPTS") {
            self.retry.max_attempts = n;
        }
        if let Some(n) = env_parse("DEADLINE_SECS") {
            self.evaluation.deadline_secs = n;
        }

        // Logging
        if let Some(val) = env_var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = env_var("LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = env_var("LOG_JSON") {
            self.logging.json_format = val.to_lowercase() == "true" || val == "1";
        }

        // Storage
        if let Some(val) = env_var("PERSONA_STATE") {
            self.storage.persona_state_file = val;
        }
    }

    /// Expand ~ and environment variables in paths
    fn expand_paths(&mut self) {
        self.storage.persona_state_file = expand_path(&self.storage.persona_state_file);
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration, including backend credentials
    pub fn validate(&self) -> Result<()> {
        self.check_credentials()?;
        self.validate_settings()
    }

    /// The hosted backend cannot run without an API key
    pub fn check_credentials(&self) -> Result<()> {
        if self.backend.kind == BackendKind::Hosted && self.backend.hosted.api_key.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "backend.hosted.api_key",
                format!(
                    "the hosted backend requires an API key (set {}API_KEY or {})",
                    ENV_PREFIX, OPENAI_KEY_VAR
                ),
            ));
        }
        Ok(())
    }

    fn validate_settings(&self) -> Result<()> {
        let hosted = &self.backend.hosted;
        let local = &self.backend.local;

        validate_url("backend.hosted.base_url", &hosted.base_url)?;
        validate_url("backend.local.base_url", &local.base_url)?;

        if !(0.0..=2.0).contains(&hosted.temperature) {
            return Err(Error::config_field_invalid(
                "backend.hosted.temperature",
                format!("temperature must be between 0 and 2, got {}", hosted.temperature),
            ));
        }
        if hosted.model.trim().is_empty() || local.model.trim().is_empty() {
            return Err(Error::config_field_invalid("backend.model", "model name cannot be empty"));
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::config_field_invalid(
                "retry.max_attempts",
                "max_attempts must be at least 1",
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(Error::config_field_invalid(
                "retry.multiplier",
                "multiplier must be at least 1.0",
            ));
        }
        if self.evaluation.recommendation_count == 0 {
            return Err(Error::config_field_invalid(
                "evaluation.recommendation_count",
                "recommendation_count must be at least 1",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "invalid log level '{}', must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Persona settings document as a PathBuf
    pub fn persona_state_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.persona_state_file)
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.backend.hosted.api_key.is_empty() {
            copy.backend.hosted.api_key = "********".to_string();
        }
        copy
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, key)).ok()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_var(key).and_then(|v| v.trim().parse().ok())
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| Error::config_field_invalid(field, format!("invalid URL '{}': {}", value, e)))
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file, returning where it was written
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".idea-council")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Default configuration content with comments
fn generate_default_config() -> String {
    r#"# idea-council configuration

[backend]
# Model backend: hosted (OpenAI-compatible API), local (Ollama) or mock
kind = "hosted"

[backend.hosted]
base_url = "https://api.openai.com/v1"

# API key; leave empty to use IDEA_COUNCIL_API_KEY or OPENAI_API_KEY
api_key = ""

model = "gpt-4o"

# Sampling temperature (0.0 - 2.0)
temperature = 0.7

# Request timeout in seconds
timeout_secs = 120

[backend.local]
# Ollama server URL, without the /api suffix
base_url = "http://localhost:11434"
model = "llama3.1"
timeout_secs = 300

[retry]
# Attempts per structured call before default-filling
max_attempts = 3

# Exponential backoff between attempts
initial_delay_ms = 1000
max_delay_ms = 8000
multiplier = 2.0

[evaluation]
# Wall-clock bound for a run in seconds (0 = unbounded)
deadline_secs = 0

# Recommendations to produce when the advisor supplies none
recommendation_count = 5

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log file path (comment out to disable file logging)
# file = "~/.idea-council/logs/idea-council.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false

[storage]
# Persona enabled/priority settings
persona_state_file = "~/.idea-council/personas.json"
"#
    .to_string()
}
