//! Configuration system tests
//!
//! Tests configuration loading, validation, and environment overrides
//! through the binary, so search paths and env handling are exercised as
//! a user would hit them.

mod common;

use common::TestHome;
use predicates::prelude::*;

// ─────────────────────────────────────────────────────────────────
// Valid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_minimal_config() {
    let home = TestHome::new();
    let path = home.write_config(
        r#"
[backend]
kind = "mock"
"#,
    );

    home.command()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_full_config() {
    let home = TestHome::new();
    let path = home.write_config(
        r#"
[backend]
kind = "hosted"

[backend.hosted]
base_url = "https://llm.example.com/v1"
api_key = "sk-from-file"
model = "gpt-4o-mini"
temperature = 0.2
timeout_secs = 60

[backend.local]
base_url = "http://gpu-box:11434"
model = "mistral"
timeout_secs = 600

[retry]
max_attempts = 5
initial_delay_ms = 250
max_delay_ms = 4000
multiplier = 1.5

[evaluation]
deadline_secs = 120
recommendation_count = 7

[logging]
level = "debug"
json_format = true
max_files = 3

[storage]
persona_state_file = "~/.idea-council/personas.json"
"#,
    );

    home.command()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .success();

    home.command()
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("gpt-4o-mini"))
        .stdout(predicate::str::contains("recommendation_count = 7"))
        .stdout(predicate::str::contains("sk-from-file").not());
}

#[test]
fn test_search_path_in_home() {
    let home = TestHome::new();
    let dir = home.path().join(".idea-council");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "[evaluation]\nrecommendation_count = 9\n",
    )
    .unwrap();

    home.command()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("recommendation_count = 9"));
}

#[test]
fn test_working_directory_config_wins() {
    let home = TestHome::new();
    std::fs::write(
        home.path().join("idea-council.toml"),
        "[evaluation]\nrecommendation_count = 4\n",
    )
    .unwrap();

    home.command()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("recommendation_count = 4"));
}

// ─────────────────────────────────────────────────────────────────
// Environment Override Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_env_overrides_file() {
    let home = TestHome::new();
    let path = home.write_config(
        r#"
[backend]
kind = "hosted"

[backend.local]
model = "mistral"
"#,
    );

    home.command()
        .env("IDEA_COUNCIL_BACKEND", "local")
        .env("IDEA_COUNCIL_OLLAMA_MODEL", "qwen2")
        .args(["config", "show", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("kind = \"local\""))
        .stdout(predicate::str::contains("qwen2"));
}

#[test]
fn test_config_path_from_env() {
    let home = TestHome::new();
    let path = home.write_config("[retry]\nmax_attempts = 0\n");

    home.command()
        .env("IDEA_COUNCIL_CONFIG", &path)
        .args(["config", "validate"])
        .assert()
        .failure()
        .code(10);
}

// ─────────────────────────────────────────────────────────────────
// Invalid Configuration Tests
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_toml() {
    let home = TestHome::new();
    let path = home.write_config("[backend\nkind = ");

    home.command()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("E101"));
}

#[test]
fn test_invalid_backend_kind() {
    let home = TestHome::new();
    let path = home.write_config("[backend]\nkind = \"quantum\"\n");

    home.command()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .code(10);
}

#[test]
fn test_invalid_url() {
    let home = TestHome::new();
    let path = home.write_config(
        r#"
[backend]
kind = "local"

[backend.local]
base_url = "not a url"
"#,
    );

    home.command()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .code(10)
        .stderr(predicate::str::contains("invalid URL"));
}

#[test]
fn test_invalid_temperature() {
    let home = TestHome::new();
    let path = home.write_config(
        r#"
[backend]
kind = "mock"

[backend.hosted]
temperature = 3.5
"#,
    );

    home.command()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("temperature"));
}

#[test]
fn test_invalid_log_level() {
    let home = TestHome::new();
    let path = home.write_config(
        r#"
[backend]
kind = "mock"

[logging]
level = "loud"
"#,
    );

    home.command()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid log level"));
}

#[test]
fn test_zero_recommendation_count() {
    let home = TestHome::new();
    let path = home.write_config(
        r#"
[backend]
kind = "mock"

[evaluation]
recommendation_count = 0
"#,
    );

    home.command()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("recommendation_count"));
}

// ─────────────────────────────────────────────────────────────────
// Settings That Reach Evaluation
// ─────────────────────────────────────────────────────────────────

#[test]
fn test_recommendation_count_reaches_report() {
    let home = TestHome::new();
    let path = home.write_config(
        r#"
[backend]
kind = "mock"

[evaluation]
recommendation_count = 3
"#,
    );

    let output = home
        .command()
        .args(["evaluate", "Idea", "-p", "elon_musk", "--format", "json", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let eval: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(eval["recommendations"].as_array().unwrap().len(), 3);
}

#[test]
fn test_log_file_written() {
    let home = TestHome::new();
    let log = home.path().join("logs").join("council.log");

    home.mock_command()
        .env("IDEA_COUNCIL_LOG_FILE", &log)
        .env("IDEA_COUNCIL_LOG_LEVEL", "info")
        .args(["evaluate", "Idea", "-p", "sam_altman"])
        .assert()
        .success();

    let logs_dir = home.path().join("logs");
    let written = std::fs::read_dir(&logs_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().starts_with("council"));
    assert!(written);
}
