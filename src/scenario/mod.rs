//! Scenario engine
//!
//! Reads YAML scenario files, compiles them into typed steps and runs the
//! steps in order against an HTTP service. Values flow between steps
//! through captures and `$RESPONSE`/`$HISTORY` reads; the dynamic context
//! arrives as an explicit [`Environment`].

pub mod compiler;
pub mod context;
pub mod fixture;
pub mod jsonpath;
pub mod template;
pub mod transport;
mod runner;

pub use compiler::{compile, CompiledScenario, Step};
pub use context::{Environment, ExecutionContext, StepRecord};
pub use fixture::{load_fixture, parse_fixture, ScenarioFile};
pub use runner::{RunOptions, RunResult, ScenarioRunner, StepFailure};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
