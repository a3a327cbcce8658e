//! Scenario file loading
//!
//! A scenario file is a YAML document with an optional `defaults`
//! mapping and a required, ordered `tests` list:
//!
//! ```yaml
//! defaults:
//!   request_headers:
//!     x-auth-token: $ENVIRON['USER_TOKEN']
//!
//! tests:
//!   - name: create alarm
//!     POST: $ENVIRON['AODH_SERVICE_URL']/v2/alarms
//!     data:
//!       name: cpu_high
//!     status: 201
//!     capture:
//!       alarm_id: $.alarm_id
//!
//!   - name: get alarm
//!     GET: $ENVIRON['AODH_SERVICE_URL']/v2/alarms/$CAPTURE['alarm_id']
//!     response_json_paths:
//!       $.name: cpu_high
//! ```

use serde::Deserialize;
use serde_json::Value;
use serde_yaml::{Mapping, Value as YamlValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

/// HTTP methods accepted as shorthand keys (`GET: /path`)
pub const METHOD_KEYS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// A loaded scenario file
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioFile {
    /// Where the file was loaded from
    #[serde(skip)]
    pub path: PathBuf,
    /// Options applied to every step
    pub defaults: Defaults,
    /// Ordered step definitions
    pub tests: Vec<StepDef>,
}

impl ScenarioFile {
    /// Scenario name: the file stem
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Accepted status codes: `200` or `"200 || 201"`
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StatusSpec {
    Code(u16),
    Expr(String),
}

/// Scenario-wide defaults
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Defaults {
    /// Verify TLS certificates; injected from configuration when absent
    pub cert_validate: Option<bool>,
    /// Use https for relative URLs
    pub ssl: Option<bool>,
    /// Target host for relative URLs
    pub host: Option<String>,
    /// Target port for relative URLs
    pub port: Option<u16>,
    /// Default HTTP method
    pub method: Option<String>,
    /// Default expected status
    pub status: Option<StatusSpec>,
    /// Headers sent with every request
    #[serde(default)]
    pub request_headers: BTreeMap<String, Value>,
    /// Time budget for the whole scenario, in seconds
    pub timeout: Option<u64>,
}

/// One request/response block
#[derive(Deserialize, Debug, Clone)]
pub struct StepDef {
    /// Step name, used in failure reports
    pub name: String,
    /// Free-form description
    pub desc: Option<String>,
    /// HTTP method (default: GET)
    pub method: Option<String>,
    /// Absolute URL or path relative to the scenario target
    pub url: String,
    /// Request headers
    #[serde(default)]
    pub request_headers: BTreeMap<String, Value>,
    /// Request body; mappings and sequences are sent as JSON
    pub data: Option<Value>,
    /// Expected status code(s)
    pub status: Option<StatusSpec>,
    /// Expected response headers; `/regex/` values are matched as patterns
    #[serde(default)]
    pub response_headers: BTreeMap<String, Value>,
    /// Expected values at JSON paths of the response body
    #[serde(default)]
    pub response_json_paths: BTreeMap<String, Value>,
    /// Substrings the response body must contain
    #[serde(default)]
    pub response_strings: Vec<String>,
    /// Values to capture from the JSON response: name -> JSON path
    #[serde(default)]
    pub capture: BTreeMap<String, String>,
    /// Use https for this step's relative URL
    pub ssl: Option<bool>,
    /// Skip this step with the given reason
    pub skip: Option<String>,
}

/// Load a scenario file from `dir/filename`
///
/// `cert_validate` is the ambient certificate-validation policy; it is
/// written into `defaults.cert_validate` only when the file does not set
/// it explicitly.
pub fn load_fixture(dir: &Path, filename: &str, cert_validate: bool) -> Result<ScenarioFile> {
    let path = dir.join(filename);
    let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    let mut scenario = parse_fixture(&path.display().to_string(), &content, cert_validate)?;
    scenario.path = path;
    Ok(scenario)
}

/// Parse scenario YAML; `origin` names the document in errors
pub fn parse_fixture(origin: &str, content: &str, cert_validate: bool) -> Result<ScenarioFile> {
    let mut document: YamlValue = serde_yaml::from_str(content)
        .map_err(|e| Error::fixture_parse(origin, format!("invalid YAML: {}", e)))?;

    let root = document
        .as_mapping_mut()
        .ok_or_else(|| Error::fixture_parse(origin, "document must be a mapping"))?;

    match root.get_mut("tests") {
        Some(YamlValue::Sequence(steps)) => {
            for (i, step) in steps.iter_mut().enumerate() {
                expand_method_shorthand(step).map_err(|msg| {
                    Error::fixture_parse(origin, format!("test {}: {}", i + 1, msg))
                })?;
            }
        }
        Some(_) => return Err(Error::fixture_parse(origin, "'tests' must be a list")),
        None => return Err(Error::fixture_parse(origin, "missing required 'tests' list")),
    }

    let defaults = root
        .entry(YamlValue::from("defaults"))
        .or_insert_with(|| YamlValue::Mapping(Mapping::new()));
    if defaults.is_null() {
        *defaults = YamlValue::Mapping(Mapping::new());
    }
    let defaults = defaults
        .as_mapping_mut()
        .ok_or_else(|| Error::fixture_parse(origin, "'defaults' must be a mapping"))?;
    if !defaults.contains_key("cert_validate") {
        defaults.insert(YamlValue::from("cert_validate"), YamlValue::Bool(cert_validate));
    }

    serde_yaml::from_value(document).map_err(|e| Error::fixture_parse(origin, e.to_string()))
}

/// Rewrite `GET: /path` into `method: GET` + `url: /path`
fn expand_method_shorthand(step: &mut YamlValue) -> std::result::Result<(), String> {
    let map = step
        .as_mapping_mut()
        .ok_or_else(|| "each test must be a mapping".to_string())?;

    let found: Vec<&str> = METHOD_KEYS
        .iter()
        .copied()
        .filter(|m| map.contains_key(*m))
        .collect();

    match found.as_slice() {
        [] => Ok(()),
        [method] => {
            if map.contains_key("url") {
                return Err(format!("both '{}' and 'url' are set", method));
            }
            if let Some(url) = map.remove(*method) {
                map.insert(YamlValue::from("method"), YamlValue::from(*method));
                map.insert(YamlValue::from("url"), url);
            }
            Ok(())
        }
        several => Err(format!("multiple methods set: {}", several.join(", "))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MINIMAL: &str = r#"
tests:
  - name: list alarms
    GET: /v2/alarms
"#;

    #[test]
    fn test_missing_defaults_get_ambient_cert_validate() {
        let scenario = parse_fixture("minimal.yaml", MINIMAL, false).unwrap();
        assert_eq!(scenario.defaults.cert_validate, Some(false));

        let scenario = parse_fixture("minimal.yaml", MINIMAL, true).unwrap();
        assert_eq!(scenario.defaults.cert_validate, Some(true));
    }

    #[test]
    fn test_explicit_cert_validate_is_kept() {
        let content = r#"
defaults:
  cert_validate: true
tests:
  - name: list alarms
    url: /v2/alarms
"#;
        let scenario = parse_fixture("explicit.yaml", content, false).unwrap();
        assert_eq!(scenario.defaults.cert_validate, Some(true));
    }

    #[test]
    fn test_empty_defaults_section() {
        let content = "defaults:\ntests:\n  - name: a\n    url: /\n";
        let scenario = parse_fixture("empty.yaml", content, false).unwrap();
        assert_eq!(scenario.defaults.cert_validate, Some(false));
    }

    #[test]
    fn test_method_shorthand() {
        let content = r#"
tests:
  - name: create
    POST: /v2/alarms
    data:
      name: cpu_high
      threshold: 10
    status: 201
"#;
        let scenario = parse_fixture("create.yaml", content, true).unwrap();
        let step = &scenario.tests[0];
        assert_eq!(step.method.as_deref(), Some("POST"));
        assert_eq!(step.url, "/v2/alarms");
        assert_eq!(step.data, Some(json!({"name": "cpu_high", "threshold": 10})));
        assert_eq!(step.status, Some(StatusSpec::Code(201)));
    }

    #[test]
    fn test_status_expression() {
        let content = "tests:\n  - name: a\n    url: /\n    status: 200 || 204\n";
        let scenario = parse_fixture("status.yaml", content, true).unwrap();
        assert_eq!(
            scenario.tests[0].status,
            Some(StatusSpec::Expr("200 || 204".to_string()))
        );
    }

    #[test]
    fn test_steps_keep_document_order() {
        let content = r#"
tests:
  - name: first
    url: /1
  - name: second
    url: /2
  - name: third
    url: /3
"#;
        let scenario = parse_fixture("order.yaml", content, true).unwrap();
        let names: Vec<&str> = scenario.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn test_malformed_documents() {
        let cases = [
            ("not yaml: [", "invalid YAML"),
            ("- just\n- a list\n", "must be a mapping"),
            ("defaults: {}\n", "missing required 'tests'"),
            ("tests: nope\n", "must be a list"),
            ("defaults: 3\ntests: []\n", "'defaults' must be a mapping"),
            ("tests:\n  - name: a\n", "url"),
            ("tests:\n  - name: a\n    GET: /\n    url: /\n", "both 'GET' and 'url'"),
            ("tests:\n  - name: a\n    GET: /\n    PUT: /\n", "multiple methods"),
        ];
        for (content, expected) in cases {
            let err = parse_fixture("bad.yaml", content, true).unwrap_err();
            assert!(
                matches!(err, Error::FixtureParse { .. }),
                "expected FixtureParse for {:?}, got {:?}",
                content,
                err
            );
            assert!(
                err.to_string().contains(expected),
                "error {:?} should mention {:?}",
                err.to_string(),
                expected
            );
        }
    }

    #[test]
    fn test_load_fixture_sets_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("alarm-crud.yaml"), MINIMAL).unwrap();
        let scenario = load_fixture(dir.path(), "alarm-crud.yaml", true).unwrap();
        assert_eq!(scenario.name(), "alarm-crud");
        assert_eq!(scenario.tests.len(), 1);

        let err = load_fixture(dir.path(), "missing.yaml", true).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }
}
