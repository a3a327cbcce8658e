//! Execution context for one scenario run

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::template::VarRead;

/// Key/value context read by `$ENVIRON['NAME']`
///
/// Built by an environment bridge before a scenario runs and passed to the
/// runner by reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    values: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay another environment; its values win
    pub fn merge(&mut self, other: Environment) {
        self.values.extend(other.values);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// What a completed step left behind for later steps
#[derive(Debug, Clone, Default)]
pub struct StepRecord {
    pub status: u16,
    /// Lower-cased header names
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub json: Option<Value>,
}

impl StepRecord {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Mutable state of one scenario run
///
/// Never shared between runs: the runner creates one per scenario.
#[derive(Debug)]
pub struct ExecutionContext<'env> {
    environment: &'env Environment,
    scheme: String,
    netloc: String,
    captures: HashMap<String, Value>,
    /// Indexed by step index - 1; `None` for skipped steps
    history: Vec<Option<StepRecord>>,
}

impl<'env> ExecutionContext<'env> {
    pub fn new(environment: &'env Environment, scheme: &str, netloc: &str) -> Self {
        Self {
            environment,
            scheme: scheme.to_string(),
            netloc: netloc.to_string(),
            captures: HashMap::new(),
            history: Vec::new(),
        }
    }

    pub fn capture(&mut self, name: &str, value: Value) {
        self.captures.insert(name.to_string(), value);
    }

    /// Append the outcome of the next step (`None` when it was skipped)
    pub fn record(&mut self, record: Option<StepRecord>) {
        self.history.push(record);
    }

    fn step(&self, step: usize) -> Result<&StepRecord, String> {
        match step.checked_sub(1).and_then(|i| self.history.get(i)) {
            Some(Some(record)) => Ok(record),
            Some(None) => Err(format!("step {} was skipped", step)),
            None => Err(format!("step {} has not run", step)),
        }
    }

    /// Resolve one template read
    pub fn resolve(&self, read: &VarRead) -> Result<Value, String> {
        match read {
            VarRead::Environ(name) => self
                .environment
                .get(name)
                .map(|v| Value::String(v.to_string()))
                .ok_or_else(|| format!("undefined environment value '{}'", name)),
            VarRead::Capture(name) => self
                .captures
                .get(name)
                .cloned()
                .ok_or_else(|| format!("capture '{}' has no value", name)),
            VarRead::Response { step, path } => {
                let record = self.step(*step)?;
                let json = record
                    .json
                    .as_ref()
                    .ok_or_else(|| format!("response of step {} is not JSON", step))?;
                path.query(json).ok_or_else(|| {
                    format!("JSON path '{}' not found in response of step {}", path, step)
                })
            }
            VarRead::Location { step } => {
                let record = self.step(*step)?;
                record
                    .header("location")
                    .map(|v| Value::String(v.to_string()))
                    .ok_or_else(|| format!("step {} response has no Location header", step))
            }
            VarRead::Netloc => Ok(Value::String(self.netloc.clone())),
            VarRead::Scheme => Ok(Value::String(self.scheme.clone())),
        }
    }
}
