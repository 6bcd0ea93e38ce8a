//! Backend module for model access
//!
//! This module provides the core abstraction for text-generation backends
//! and implementations for the hosted chat API, a local Ollama server and
//! an in-process mock.

mod traits;
mod registry;
mod mock;
mod ollama;
mod openai;

pub use traits::*;
pub use registry::*;
pub use mock::{MockBackend, MockConfig, MockFailure, MockReply};
pub use ollama::{OllamaBackend, OllamaConfig};
pub use openai::{OpenAiBackend, OpenAiConfig};

use crate::error::Error;

/// Map a reqwest transport failure onto the backend error taxonomy
pub(crate) fn transport_error(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::RequestTimeout {
            url: url.to_string(),
        }
    } else {
        Error::connection_failed(url, err.to_string())
    }
}
