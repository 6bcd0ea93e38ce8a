//! Error types for Idea Council
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Retry/fatal classification used by the structured-call layer
//! - Exit codes for CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for evaluation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,

    // Backend errors (3xx)
    ConnectionFailed = 300,
    RequestTimeout = 301,
    BackendStatus = 302,
    AuthenticationFailed = 303,
    BackendUnavailable = 304,

    // Parse errors (4xx)
    ParseFailed = 400,
    Serialization = 401,

    // Evaluation errors (5xx)
    InvalidInput = 500,
    PersonaNotFound = 501,
    PersonaFailed = 502,
    Cancelled = 503,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10, // Config errors
            200..=299 => 20, // IO errors
            300..=399 => 30, // Backend errors
            400..=499 => 40, // Parse errors
            500..=599 => 50, // Evaluation errors
            900..=999 => 90, // Internal errors
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    /// File read error
    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File write error
    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Backend Errors
    // ─────────────────────────────────────────────────────────────

    /// Could not reach the model endpoint
    #[error("Failed to connect to {url}: {message}")]
    ConnectionFailed { url: String, message: String },

    /// Request to the model endpoint timed out
    #[error("Request to {url} timed out")]
    RequestTimeout { url: String },

    /// Model endpoint answered with a non-success status
    #[error("Backend returned status {status}: {body}")]
    BackendStatus { status: u16, body: String },

    /// Credentials rejected by the hosted API
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// No usable backend (missing credential, local server down)
    #[error("Backend '{backend}' unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Parse Errors
    // ─────────────────────────────────────────────────────────────

    /// Model output could not be turned into the requested structure
    #[error("Failed to parse model output: {message}")]
    ParseFailed { message: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Evaluation Errors
    // ─────────────────────────────────────────────────────────────

    /// Caller supplied unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persona id not in the catalog
    #[error("Persona not found: {id}")]
    PersonaNotFound { id: String },

    /// A persona pipeline failed
    #[error("Persona {id} failed: {message}")]
    PersonaFailed { id: String, message: String },

    /// Run deadline expired before the work finished
    #[error("Cancelled: {0}")]
    Cancelled(String),

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::Config(_) => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,

            Error::ConnectionFailed { .. } => ErrorCode::ConnectionFailed,
            Error::RequestTimeout { .. } => ErrorCode::RequestTimeout,
            Error::BackendStatus { .. } => ErrorCode::BackendStatus,
            Error::AuthenticationFailed { .. } => ErrorCode::AuthenticationFailed,
            Error::BackendUnavailable { .. } => ErrorCode::BackendUnavailable,

            Error::ParseFailed { .. } => ErrorCode::ParseFailed,
            Error::Json(_) => ErrorCode::Serialization,

            Error::InvalidInput(_) => ErrorCode::InvalidInput,
            Error::PersonaNotFound { .. } => ErrorCode::PersonaNotFound,
            Error::PersonaFailed { .. } => ErrorCode::PersonaFailed,
            Error::Cancelled(_) => ErrorCode::Cancelled,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if a failed model call is worth repeating
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ConnectionFailed { .. }
            | Error::RequestTimeout { .. }
            | Error::ParseFailed { .. }
            | Error::Json(_) => true,
            Error::BackendStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Check if the error is fatal (the run must abort)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::Config(_)
                | Error::AuthenticationFailed { .. }
                | Error::BackendUnavailable { .. }
        )
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'idea-council config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'idea-council config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::AuthenticationFailed { .. } => Some(
                "Set IDEA_COUNCIL_API_KEY (or OPENAI_API_KEY), or switch to the local backend with IDEA_COUNCIL_BACKEND=local."
            ),
            Error::BackendUnavailable { .. } => Some(
                "Start the local model server (e.g. 'ollama serve') or configure a hosted API key."
            ),
            Error::ConnectionFailed { .. } => Some(
                "Check that the model endpoint URL is correct and reachable."
            ),
            Error::InvalidInput(_) => Some(
                "Provide a non-empty product idea."
            ),
            Error::PersonaNotFound { .. } => Some(
                "Run 'idea-council personas list' to see the available persona ids."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let code = self.code();
        let suggestion = self.suggestion();

        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            code.as_str(),
            self
        );

        if let Some(hint) = suggestion {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    /// Create a config parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config validation error with field name
    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a connection failed error
    pub fn connection_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConnectionFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a parse failure
    pub fn parse_failed(message: impl Into<String>) -> Self {
        Error::ParseFailed {
            message: message.into(),
        }
    }

    /// Create a persona failure
    pub fn persona_failed(id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::PersonaFailed {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a backend unavailable error
    pub fn backend_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::BackendUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::ConnectionFailed.as_str(), "E300");
        assert_eq!(ErrorCode::PersonaFailed.as_str(), "E502");
        assert_eq!(ErrorCode::InternalError.as_str(), "E900");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::ConfigValidation.exit_code(), 10);
        assert_eq!(ErrorCode::IoWrite.exit_code(), 20);
        assert_eq!(ErrorCode::BackendUnavailable.exit_code(), 30);
        assert_eq!(ErrorCode::ParseFailed.exit_code(), 40);
        assert_eq!(ErrorCode::InvalidInput.exit_code(), 50);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_retryable_backend_errors() {
        assert!(Error::connection_failed("http://x", "refused").is_retryable());
        assert!(Error::RequestTimeout { url: "http://x".into() }.is_retryable());
        assert!(Error::BackendStatus { status: 429, body: String::new() }.is_retryable());
        assert!(Error::BackendStatus { status: 503, body: String::new() }.is_retryable());
        assert!(!Error::BackendStatus { status: 400, body: String::new() }.is_retryable());
        assert!(Error::parse_failed("bad json").is_retryable());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(Error::AuthenticationFailed { message: "401".into() }.is_fatal());
        assert!(Error::backend_unavailable("local", "down").is_fatal());
        assert!(Error::config_field_invalid("backend.hosted.api_key", "missing").is_fatal());
        assert!(!Error::connection_failed("url", "test").is_fatal());
        assert!(!Error::persona_failed("sam_altman", "boom").is_fatal());
    }

    #[test]
    fn test_error_suggestions() {
        let err = Error::backend_unavailable("local", "connection refused");
        assert!(err.suggestion().unwrap().contains("ollama serve"));

        let err = Error::PersonaNotFound { id: "nobody".into() };
        assert!(err.suggestion().unwrap().contains("personas list"));
    }

    #[test]
    fn test_format_for_terminal() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/test/config.toml"),
        };
        let formatted = err.format_for_terminal();

        assert!(formatted.contains("E100"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let err = Error::InvalidInput("empty idea".into());
        let formatted = err.format_for_log();

        assert!(formatted.contains("[E500]"));
        assert!(!formatted.contains("\x1b["));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        assert_eq!(err.code(), ErrorCode::IoNotFound);
    }
}
