//! Error types for the scenario harness
//!
//! Errors raised while assembling a suite (discovery, naming) are fatal.
//! Errors raised while running one scenario are reported against that
//! scenario only.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the scenario harness
#[derive(Error, Debug)]
pub enum Error {
    // === Fixture Errors ===
    #[error("Invalid scenario file '{path}': {message}")]
    FixtureParse { path: String, message: String },

    #[error("Scenario compile error at step {step}: {message}")]
    ScenarioCompile { step: usize, message: String },

    // === Execution Errors ===
    #[error("From test \"{name}\" (step {step}): {detail}")]
    StepAssertion {
        step: usize,
        name: String,
        detail: String,
    },

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Scenario timed out after {0} seconds")]
    Timeout(u64),

    // === Registration Errors ===
    #[error("No scenario files found in '{}'", .0.display())]
    EmptyFixtureDirectory(PathBuf),

    #[error("Scenario files '{first}' and '{second}' both map to test name '{name}'")]
    DuplicateTestName {
        name: String,
        first: String,
        second: String,
    },

    #[error("{failed} of {total} test cases failed")]
    SuiteFailed { failed: usize, total: usize },

    // === Environment Errors ===
    #[error("Endpoint resolution failed: {0}")]
    Endpoint(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a fixture parse error for a file
    pub fn fixture_parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FixtureParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a compile error attributed to a 1-based step index
    pub fn compile(step: usize, message: impl Into<String>) -> Self {
        Self::ScenarioCompile {
            step,
            message: message.into(),
        }
    }

    /// Create a step assertion error
    pub fn assertion(step: usize, name: &str, detail: impl Into<String>) -> Self {
        Self::StepAssertion {
            step,
            name: name.to_string(),
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Error::Transport(format!("request timed out: {}", e));
        }
        if e.is_connect() {
            return Error::Transport(format!("connection failed: {}", e));
        }
        Error::Transport(e.to_string())
    }
}
