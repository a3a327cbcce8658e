//! Telemetry Scenarios - declarative HTTP scenario runner
//!
//! Scenario files describe ordered HTTP requests and the responses they
//! must produce. This library discovers them, prepares the environment
//! they read, and runs each one as an independent test case.

pub mod bridge;
pub mod cli;
pub mod commands;
pub mod common;
pub mod registrar;
pub mod scenario;

// Re-export commonly used types for tests
pub use bridge::{EnvironmentBridge, Preparation, StaticBridge};
pub use common::{Error, Result};
pub use registrar::{generate_name, SuiteReport, TestCase, TestOutcome, TestSuite};
pub use scenario::{Environment, RunOptions, RunResult, ScenarioRunner};
