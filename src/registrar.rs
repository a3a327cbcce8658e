//! Test registration
//!
//! Turns a directory of scenario files into a table of named test cases.
//! Each case is run independently: a failing or skipped case never
//! affects the others.

use colored::Colorize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::bridge::{EnvironmentBridge, Preparation};
use crate::common::{Error, Result};
use crate::scenario::{compile, load_fixture, HttpTransport, ScenarioRunner};

/// Prefix of every generated test name
pub const TEST_NAME_PREFIX: &str = "test_";

/// Derive a test name from a scenario file name
///
/// `My-Scenario.yaml` becomes `test_my_scenario`.
pub fn generate_name(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    format!("{}{}", TEST_NAME_PREFIX, stem.to_lowercase().replace('-', "_"))
}

/// One runnable test bound to a scenario file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub dir: PathBuf,
    pub filename: String,
}

/// Result of running one test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed { diagnostic: String },
    Skipped { reason: String },
}

impl TestOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TestOutcome::Failed { .. })
    }
}

impl TestCase {
    pub fn new(dir: PathBuf, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            name: generate_name(&filename),
            dir,
            filename,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }

    /// Prepare the environment, then load, compile and run the scenario
    ///
    /// The scenario file is read when the case runs, not when it is
    /// registered, so edits between discovery and execution are seen.
    pub async fn run<T: HttpTransport>(
        &self,
        bridge: &dyn EnvironmentBridge,
        runner: &ScenarioRunner<T>,
    ) -> TestOutcome {
        let environment = match bridge.prepare(self).await {
            Ok(Preparation::Ready(environment)) => environment,
            Ok(Preparation::Skip(reason)) => {
                info!(case = %self.name, reason = %reason, "Skipping test case");
                return TestOutcome::Skipped { reason };
            }
            Err(e) => {
                warn!(case = %self.name, "Environment preparation failed: {}", e);
                return TestOutcome::Failed {
                    diagnostic: e.to_string(),
                };
            }
        };

        let scenario = match load_fixture(&self.dir, &self.filename, runner.options().cert_validate)
            .and_then(|file| compile(&file))
        {
            Ok(scenario) => scenario,
            Err(e) => {
                warn!(
                    case = %self.name,
                    path = %self.path().display(),
                    "Scenario could not be loaded: {}",
                    e
                );
                return TestOutcome::Failed {
                    diagnostic: e.to_string(),
                };
            }
        };

        let result = runner.run(&scenario, &environment).await;
        match result.diagnostic() {
            None => TestOutcome::Passed,
            Some(diagnostic) => TestOutcome::Failed { diagnostic },
        }
    }
}

/// The table of test cases discovered in one directory
#[derive(Debug, Clone)]
pub struct TestSuite {
    dir: PathBuf,
    cases: Vec<TestCase>,
}

impl TestSuite {
    /// Register one case per `*.<extension>` file in `dir`, sorted by name
    pub fn discover(dir: &Path, extension: &str) -> Result<Self> {
        let mut filenames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(extension) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                filenames.push(name.to_string());
            }
        }

        if filenames.is_empty() {
            return Err(Error::EmptyFixtureDirectory(dir.to_path_buf()));
        }

        let mut cases: Vec<TestCase> = filenames
            .into_iter()
            .map(|filename| TestCase::new(dir.to_path_buf(), filename))
            .collect();
        cases.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.filename.cmp(&b.filename)));

        let mut seen: HashMap<&str, &str> = HashMap::new();
        for case in &cases {
            if let Some(first) = seen.insert(&case.name, &case.filename) {
                return Err(Error::DuplicateTestName {
                    name: case.name.clone(),
                    first: first.to_string(),
                    second: case.filename.clone(),
                });
            }
        }

        debug!(dir = %dir.display(), cases = cases.len(), "Discovered scenario files");
        Ok(Self {
            dir: dir.to_path_buf(),
            cases,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Keep only cases whose name contains `pattern`
    pub fn filter(mut self, pattern: &str) -> Self {
        self.cases.retain(|case| case.name.contains(pattern));
        self
    }

    /// Run every case in order and collect the outcomes
    pub async fn run_all<T: HttpTransport>(
        &self,
        bridge: &dyn EnvironmentBridge,
        runner: &ScenarioRunner<T>,
    ) -> SuiteReport {
        let mut rows = Vec::with_capacity(self.cases.len());
        for case in &self.cases {
            let outcome = case.run(bridge, runner).await;
            rows.push((case.name.clone(), outcome));
        }
        let report = SuiteReport { rows };
        info!(
            passed = report.passed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Suite finished"
        );
        report
    }
}

/// Outcomes of a suite run, in execution order
#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    pub rows: Vec<(String, TestOutcome)>,
}

impl SuiteReport {
    fn count(&self, pred: impl Fn(&TestOutcome) -> bool) -> usize {
        self.rows.iter().filter(|(_, outcome)| pred(outcome)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, TestOutcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(TestOutcome::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TestOutcome::Skipped { .. }))
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Print one line per case followed by a summary
    pub fn print(&self) {
        for (name, outcome) in &self.rows {
            match outcome {
                TestOutcome::Passed => println!("{} {}", "✓".green(), name),
                TestOutcome::Skipped { reason } => {
                    let reason = format!("(skipped: {})", reason);
                    println!("{} {} {}", "-".yellow(), name, reason.dimmed())
                }
                TestOutcome::Failed { diagnostic } => {
                    println!("{} {}", "✗".red(), name);
                    for line in diagnostic.lines() {
                        println!("    {}", line);
                    }
                }
            }
        }

        println!();
        let summary = format!(
            "{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        );
        if self.is_success() {
            println!("{}", summary.green().bold());
        } else {
            println!("{}", summary.red().bold());
        }
    }
}
