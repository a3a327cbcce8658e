//! Scenario compilation
//!
//! Turns a loaded [`ScenarioFile`] into an ordered list of executable
//! [`Step`]s. Defaults are folded into every step, templates are parsed,
//! and structural references (`$RESPONSE`, `$HISTORY`, `$LOCATION`) are
//! bound to the step they read from. Any reference that cannot be
//! satisfied by an earlier step is rejected here, before a single
//! request is sent.

use reqwest::Method;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::common::{Error, Result};

use super::fixture::{ScenarioFile, StatusSpec, StepDef, METHOD_KEYS};
use super::jsonpath::JsonPath;
use super::template::{self, Piece, Reference, Template, VarRead};

/// A scenario ready to run
#[derive(Debug, Clone)]
pub struct CompiledScenario {
    pub name: String,
    pub path: PathBuf,
    pub settings: ScenarioSettings,
    pub steps: Vec<Step>,
}

/// Effective scenario-wide settings
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSettings {
    pub cert_validate: bool,
    pub ssl: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub timeout: Option<Duration>,
}

/// One executable request/response interaction
#[derive(Debug, Clone)]
pub struct Step {
    /// 1-based position in the scenario
    pub index: usize,
    pub name: String,
    pub method: Method,
    pub url: Template,
    pub headers: Vec<(String, Template)>,
    pub body: Option<JsonTemplate>,
    pub expect: Expectations,
    pub captures: Vec<Capture>,
    pub ssl: bool,
    pub skip: Option<String>,
}

/// What a step's response must look like
#[derive(Debug, Clone, Default)]
pub struct Expectations {
    /// Accepted status codes
    pub status: Vec<u16>,
    pub headers: Vec<(String, Template)>,
    pub json_paths: Vec<(JsonPath, JsonTemplate)>,
    pub strings: Vec<Template>,
}

/// Named value taken from a JSON response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub name: String,
    pub path: JsonPath,
}

/// JSON value whose string leaves are templates
#[derive(Debug, Clone, PartialEq)]
pub enum JsonTemplate {
    Literal(Value),
    Text(Template),
    Array(Vec<JsonTemplate>),
    Object(Vec<(String, JsonTemplate)>),
}

impl JsonTemplate {
    /// Render to a JSON value; a string that is a lone substitution keeps
    /// the substituted value's type
    pub fn render<F>(&self, lookup: &mut F) -> std::result::Result<Value, String>
    where
        F: FnMut(&VarRead) -> std::result::Result<Value, String>,
    {
        match self {
            JsonTemplate::Literal(value) => Ok(value.clone()),
            JsonTemplate::Text(template) => template.render_value(&mut *lookup),
            JsonTemplate::Array(items) => items
                .iter()
                .map(|item| item.render(&mut *lookup))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(Value::Array),
            JsonTemplate::Object(fields) => {
                let mut map = serde_json::Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), value.render(lookup)?);
                }
                Ok(Value::Object(map))
            }
        }
    }
}

/// Compile a loaded scenario
pub fn compile(file: &ScenarioFile) -> Result<CompiledScenario> {
    if file.tests.is_empty() {
        return Err(Error::compile(0, "scenario has no steps"));
    }

    let defaults = &file.defaults;
    let settings = ScenarioSettings {
        cert_validate: defaults.cert_validate.unwrap_or(true),
        ssl: defaults.ssl.unwrap_or(false),
        host: defaults.host.clone(),
        port: defaults.port,
        timeout: defaults.timeout.map(Duration::from_secs),
    };

    let mut scope = Scope::default();
    let mut steps = Vec::with_capacity(file.tests.len());

    for (i, def) in file.tests.iter().enumerate() {
        let index = i + 1;
        let step = compile_step(index, def, file, &scope)?;
        scope.admit(&step);
        steps.push(step);
    }

    Ok(CompiledScenario {
        name: file.name(),
        path: file.path.clone(),
        settings,
        steps,
    })
}

/// Names visible to the step being compiled
#[derive(Default)]
struct Scope {
    captures: HashSet<String>,
    /// Step names in order; index 0 is step 1
    names: Vec<String>,
}

impl Scope {
    /// Skipped steps never run, so their captures never exist
    fn admit(&mut self, step: &Step) {
        if step.skip.is_none() {
            self.captures
                .extend(step.captures.iter().map(|c| c.name.clone()));
        }
        self.names.push(step.name.clone());
    }

    /// The most recent earlier step with this name
    fn step_named(&self, name: &str) -> Option<usize> {
        self.names.iter().rposition(|n| n == name).map(|i| i + 1)
    }

    fn resolve(&self, index: usize, reference: Reference) -> Result<VarRead> {
        let previous = || {
            if index > 1 {
                Ok(index - 1)
            } else {
                Err(Error::compile(index, "the first step has no previous response"))
            }
        };
        let named = |name: &str| {
            self.step_named(name).ok_or_else(|| {
                Error::compile(index, format!("no earlier step named '{}'", name))
            })
        };

        match reference {
            Reference::Environ(name) => Ok(VarRead::Environ(name)),
            Reference::Capture(name) => {
                if self.captures.contains(&name) {
                    Ok(VarRead::Capture(name))
                } else {
                    Err(Error::compile(
                        index,
                        format!("'{}' is not captured by any earlier step", name),
                    ))
                }
            }
            Reference::Response { history, path } => {
                let step = match history {
                    Some(name) => named(&name)?,
                    None => previous()?,
                };
                let path = JsonPath::parse(&path).map_err(|e| Error::compile(index, e))?;
                Ok(VarRead::Response { step, path })
            }
            Reference::Location { history } => {
                let step = match history {
                    Some(name) => named(&name)?,
                    None => previous()?,
                };
                Ok(VarRead::Location { step })
            }
            Reference::Netloc => Ok(VarRead::Netloc),
            Reference::Scheme => Ok(VarRead::Scheme),
        }
    }

    fn template(&self, index: usize, text: &str) -> Result<Template> {
        let pieces = template::parse(text).map_err(|e| Error::compile(index, e))?;
        let pieces = pieces
            .into_iter()
            .map(|piece| match piece {
                Piece::Literal(text) => Ok(Piece::Literal(text)),
                Piece::Ref(reference) => self.resolve(index, reference).map(Piece::Ref),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Template::new(pieces))
    }

    fn json(&self, index: usize, value: &Value) -> Result<JsonTemplate> {
        Ok(match value {
            Value::String(text) => JsonTemplate::Text(self.template(index, text)?),
            Value::Array(items) => JsonTemplate::Array(
                items
                    .iter()
                    .map(|item| self.json(index, item))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(map) => JsonTemplate::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.json(index, v)?)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => JsonTemplate::Literal(other.clone()),
        })
    }

    fn headers(
        &self,
        index: usize,
        headers: &BTreeMap<String, Value>,
    ) -> Result<Vec<(String, Template)>> {
        headers
            .iter()
            .map(|(name, value)| {
                let text = scalar_text(value).ok_or_else(|| {
                    Error::compile(index, format!("header '{}' must be a scalar", name))
                })?;
                Ok((name.to_ascii_lowercase(), self.template(index, &text)?))
            })
            .collect()
    }
}

fn compile_step(index: usize, def: &StepDef, file: &ScenarioFile, scope: &Scope) -> Result<Step> {
    let defaults = &file.defaults;

    let method_name = def
        .method
        .as_deref()
        .or(defaults.method.as_deref())
        .unwrap_or("GET")
        .to_ascii_uppercase();
    if !METHOD_KEYS.contains(&method_name.as_str()) {
        return Err(Error::compile(
            index,
            format!("unsupported HTTP method '{}'", method_name),
        ));
    }
    let method = Method::from_bytes(method_name.as_bytes())
        .map_err(|e| Error::compile(index, e.to_string()))?;

    let status = match def.status.as_ref().or(defaults.status.as_ref()) {
        Some(spec) => parse_status(spec).map_err(|e| Error::compile(index, e))?,
        None => vec![200],
    };

    let mut merged_headers = BTreeMap::new();
    for (name, value) in defaults.request_headers.iter().chain(&def.request_headers) {
        merged_headers.insert(name.to_ascii_lowercase(), value.clone());
    }
    let headers = scope.headers(index, &merged_headers)?;

    let body = def
        .data
        .as_ref()
        .map(|data| scope.json(index, data))
        .transpose()?;

    let json_paths = def
        .response_json_paths
        .iter()
        .map(|(path, expected)| {
            let path = JsonPath::parse(path).map_err(|e| Error::compile(index, e))?;
            Ok((path, scope.json(index, expected)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let strings = def
        .response_strings
        .iter()
        .map(|s| scope.template(index, s))
        .collect::<Result<Vec<_>>>()?;

    let captures = def
        .capture
        .iter()
        .map(|(name, path)| {
            let path = JsonPath::parse(path).map_err(|e| Error::compile(index, e))?;
            Ok(Capture {
                name: name.clone(),
                path,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Step {
        index,
        name: def.name.clone(),
        method,
        url: scope.template(index, &def.url)?,
        headers,
        body,
        expect: Expectations {
            status,
            headers: scope.headers(index, &def.response_headers)?,
            json_paths,
            strings,
        },
        captures,
        ssl: def.ssl.or(defaults.ssl).unwrap_or(false),
        skip: def.skip.clone(),
    })
}

/// Parse `201` or `"200 || 201"` into the accepted codes
pub fn parse_status(spec: &StatusSpec) -> std::result::Result<Vec<u16>, String> {
    let codes = match spec {
        StatusSpec::Code(code) => vec![*code],
        StatusSpec::Expr(expr) => expr
            .split("||")
            .map(|part| {
                part.trim()
                    .parse::<u16>()
                    .map_err(|_| format!("invalid status expression '{}'", expr))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    if let Some(bad) = codes.iter().find(|c| !(100..=599).contains(*c)) {
        return Err(format!("status {} is not a valid HTTP status", bad));
    }
    Ok(codes)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::fixture::parse_fixture;
    use serde_json::json;

    fn compile_str(content: &str) -> Result<CompiledScenario> {
        compile(&parse_fixture("test.yaml", content, true)?)
    }

    #[test]
    fn test_empty_step_list_is_rejected() {
        let err = compile_str("tests: []\n").unwrap_err();
        assert!(matches!(err, Error::ScenarioCompile { step: 0, .. }));
    }

    #[test]
    fn test_capture_of_skipped_step_is_not_in_scope() {
        let err = compile_str(
            r#"
tests:
  - name: create
    POST: /v2/alarms
    skip: alarming disabled
    capture:
      id: $.id
  - name: read
    GET: /v2/alarms/$CAPTURE['id']
"#,
        )
        .unwrap_err();
        match err {
            Error::ScenarioCompile { step, message } => {
                assert_eq!(step, 2);
                assert!(message.contains("'id' is not captured"), "{}", message);
            }
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn test_capture_flows_forward() {
        let scenario = compile_str(
            r#"
tests:
  - name: create
    POST: /v2/alarms
    status: 201
    capture:
      alarm_id: $.alarm_id
  - name: read
    GET: /v2/alarms/$CAPTURE['alarm_id']
"#,
        )
        .unwrap();
        assert_eq!(scenario.steps.len(), 2);
        assert_eq!(scenario.steps[0].captures[0].name, "alarm_id");
        assert_eq!(
            scenario.steps[1].url.pieces()[1],
            Piece::Ref(VarRead::Capture("alarm_id".to_string()))
        );
    }

    #[test]
    fn test_undefined_capture_is_rejected() {
        let err = compile_str(
            r#"
tests:
  - name: read
    GET: /v2/alarms/$CAPTURE['alarm_id']
"#,
        )
        .unwrap_err();
        match err {
            Error::ScenarioCompile { step, message } => {
                assert_eq!(step, 1);
                assert!(message.contains("alarm_id"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_capture_from_later_step_is_rejected() {
        let err = compile_str(
            r#"
tests:
  - name: read
    GET: /v2/alarms/$CAPTURE['alarm_id']
  - name: create
    POST: /v2/alarms
    capture:
      alarm_id: $.alarm_id
"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ScenarioCompile { step: 1, .. }));
    }

    #[test]
    fn test_structural_references_bind_to_steps() {
        let scenario = compile_str(
            r#"
tests:
  - name: create stack
    POST: /stacks
    status: 201
  - name: poll
    GET: $LOCATION
  - name: show
    GET: /stacks/$HISTORY['create stack'].$RESPONSE['$.stack.id']
  - name: again
    GET: /stacks/$RESPONSE['$.id']
"#,
        )
        .unwrap();
        assert_eq!(
            scenario.steps[1].url.sole_read(),
            Some(&VarRead::Location { step: 1 })
        );
        match &scenario.steps[2].url.pieces()[1] {
            Piece::Ref(VarRead::Response { step, path }) => {
                assert_eq!(*step, 1);
                assert_eq!(path.as_str(), "$.stack.id");
            }
            other => panic!("unexpected piece: {:?}", other),
        }
        match &scenario.steps[3].url.pieces()[1] {
            Piece::Ref(VarRead::Response { step, .. }) => assert_eq!(*step, 3),
            other => panic!("unexpected piece: {:?}", other),
        }
    }

    #[test]
    fn test_structural_reference_errors() {
        let first = compile_str("tests:\n  - name: a\n    GET: $RESPONSE['$.id']\n").unwrap_err();
        assert!(first.to_string().contains("no previous response"));

        let loc = compile_str("tests:\n  - name: a\n    GET: $LOCATION\n").unwrap_err();
        assert!(matches!(loc, Error::ScenarioCompile { step: 1, .. }));

        let history = compile_str(
            "tests:\n  - name: a\n    GET: /\n  - name: b\n    GET: /$HISTORY['zzz'].$RESPONSE['$.id']\n",
        )
        .unwrap_err();
        assert!(matches!(history, Error::ScenarioCompile { step: 2, .. }));
        assert!(history.to_string().contains("zzz"));
    }

    #[test]
    fn test_defaults_are_folded_into_steps() {
        let scenario = compile_str(
            r#"
defaults:
  method: post
  status: 201 || 202
  ssl: true
  host: metric.example.com
  port: 8041
  timeout: 30
  request_headers:
    x-auth-token: $ENVIRON['USER_TOKEN']
    content-type: application/json
tests:
  - name: one
    url: /v1/metric
    request_headers:
      content-type: text/plain
  - name: two
    method: DELETE
    url: /v1/metric/x
    status: 204
    ssl: false
"#,
        )
        .unwrap();

        assert_eq!(scenario.settings.host.as_deref(), Some("metric.example.com"));
        assert_eq!(scenario.settings.port, Some(8041));
        assert_eq!(scenario.settings.timeout, Some(Duration::from_secs(30)));
        assert!(scenario.settings.cert_validate);
        assert!(scenario.settings.ssl);

        let one = &scenario.steps[0];
        assert_eq!(one.method, Method::POST);
        assert_eq!(one.expect.status, vec![201, 202]);
        assert!(one.ssl);
        let content_type = one
            .headers
            .iter()
            .find(|(name, _)| name == "content-type")
            .map(|(_, t)| t.clone());
        assert_eq!(content_type, Some(Template::literal("text/plain")));
        assert!(one.headers.iter().any(|(name, t)| name == "x-auth-token"
            && t.sole_read() == Some(&VarRead::Environ("USER_TOKEN".to_string()))));

        let two = &scenario.steps[1];
        assert_eq!(two.method, Method::DELETE);
        assert_eq!(two.expect.status, vec![204]);
        assert!(!two.ssl);
    }

    #[test]
    fn test_invalid_method_and_status() {
        let err = compile_str("tests:\n  - name: a\n    method: FETCH\n    url: /\n").unwrap_err();
        assert!(err.to_string().contains("FETCH"));

        let err = compile_str("tests:\n  - name: a\n    url: /\n    status: 2xx\n").unwrap_err();
        assert!(err.to_string().contains("2xx"));

        let err = compile_str("tests:\n  - name: a\n    url: /\n    status: 999\n").unwrap_err();
        assert!(err.to_string().contains("999"));
    }

    #[test]
    fn test_body_template_keeps_structure() {
        let scenario = compile_str(
            r#"
tests:
  - name: create
    POST: /alarms
    capture:
      id: $.id
  - name: update
    PUT: /alarms
    data:
      alarm_id: $CAPTURE['id']
      threshold: 10
      tags: [a, "$CAPTURE['id']-x"]
"#,
        )
        .unwrap();
        let body = scenario.steps[1].body.as_ref().unwrap();
        let mut lookup = |_: &VarRead| Ok::<Value, String>(json!(7));
        assert_eq!(
            body.render(&mut lookup).unwrap(),
            json!({"alarm_id": 7, "threshold": 10, "tags": ["a", "7-x"]})
        );
    }

    #[test]
    fn test_bad_json_path_is_compile_error() {
        let err = compile_str(
            "tests:\n  - name: a\n    url: /\n    response_json_paths:\n      name: x\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::ScenarioCompile { step: 1, .. }));
    }
}
