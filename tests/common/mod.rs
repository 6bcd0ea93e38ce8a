//! Common test utilities and fixtures
//!
//! Each test gets an isolated home directory so configuration search paths
//! and persisted persona settings never touch the real user profile.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_cmd::Command;
use parking_lot::RwLock;
use tempfile::TempDir;

use idea_council::backend::MockBackend;
use idea_council::persona::{PersonaEvaluator, PersonaRegistry};
use idea_council::structured::{RetryPolicy, StructuredCaller};
use idea_council::Orchestrator;

/// Variables that would leak the developer's setup into a test run
const SCRUBBED_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "RUST_LOG",
    "IDEA_COUNCIL_CONFIG",
    "IDEA_COUNCIL_BACKEND",
    "IDEA_COUNCIL_API_KEY",
    "IDEA_COUNCIL_API_BASE_URL",
    "IDEA_COUNCIL_MODEL",
    "IDEA_COUNCIL_OLLAMA_URL",
    "IDEA_COUNCIL_OLLAMA_MODEL",
    "IDEA_COUNCIL_MAX_ATTEMPTS",
    "IDEA_COUNCIL_DEADLINE_SECS",
    "IDEA_COUNCIL_LOG_LEVEL",
    "IDEA_COUNCIL_LOG_FILE",
    "IDEA_COUNCIL_PERSONA_STATE",
];

/// Isolated home directory for CLI runs
pub struct TestHome {
    pub root: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn state_file(&self) -> PathBuf {
        self.path().join("state").join("personas.json")
    }

    /// Write a config file into the home and return its path
    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.path().join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    /// Binary command running inside this home
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("idea-council").unwrap();
        for var in SCRUBBED_VARS {
            cmd.env_remove(var);
        }
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env("IDEA_COUNCIL_PERSONA_STATE", self.state_file());
        cmd
    }

    /// Command with the mock backend selected
    pub fn mock_command(&self) -> Command {
        let mut cmd = self.command();
        cmd.env("IDEA_COUNCIL_BACKEND", "mock");
        cmd
    }
}

/// Orchestrator over `mock` with an in-memory registry and no retry delay
pub fn mock_orchestrator(mock: MockBackend) -> (Orchestrator, Arc<MockBackend>) {
    let mock = Arc::new(mock);
    let caller = StructuredCaller::new(mock.clone(), RetryPolicy::immediate(3));
    let registry = Arc::new(RwLock::new(
        PersonaRegistry::bundled().expect("bundled catalog"),
    ));
    (
        Orchestrator::new(PersonaEvaluator::new(caller), registry),
        mock,
    )
}

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
