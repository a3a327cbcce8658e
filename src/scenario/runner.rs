//! Scenario runner
//!
//! Executes compiled steps one after another against the target,
//! stopping at the first failure. Nothing is retried: a mismatch or a
//! transport error is final for the scenario.

use colored::Colorize;
use regex::Regex;
use serde_json::{Number, Value};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::common::config::Config;
use crate::common::{Error, Result};

use super::compiler::{CompiledScenario, JsonTemplate, Step};
use super::context::{Environment, ExecutionContext, StepRecord};
use super::template::{value_to_text, VarRead};
use super::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Longest response body excerpt included in a failure
const BODY_EXCERPT_CHARS: usize = 256;

/// Runner settings that don't come from the scenario file
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Target host for relative URLs when the scenario sets none
    pub host: Option<String>,
    /// Target port for relative URLs when the scenario sets none
    pub port: Option<u16>,
    /// Time budget for one scenario
    pub budget: Duration,
    /// Ambient certificate-validation policy handed to the fixture loader
    pub cert_validate: bool,
    /// Print a line per step to stdout
    pub echo: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            budget: Duration::from_secs(300),
            cert_validate: true,
            echo: false,
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            budget: Duration::from_secs(config.harness.scenario_budget_secs()),
            cert_validate: config.cert_validate(),
            ..Self::default()
        }
    }
}

/// The step a scenario failed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// 1-based step index
    pub step: usize,
    pub name: String,
    pub detail: String,
}

/// Outcome of one scenario run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub scenario: String,
    pub success: bool,
    /// Steps attempted, including the failing one
    pub steps_run: usize,
    pub steps_total: usize,
    pub first_failure: Option<StepFailure>,
}

impl RunResult {
    /// Human-readable report of the first failure
    pub fn diagnostic(&self) -> Option<String> {
        self.first_failure.as_ref().map(|f| {
            format!(
                "From test \"{}\" (step {} of {}): {}",
                f.name, f.step, self.steps_total, f.detail
            )
        })
    }
}

/// Runs compiled scenarios over an [`HttpTransport`]
pub struct ScenarioRunner<T = ReqwestTransport> {
    transport: T,
    options: RunOptions,
}

impl ScenarioRunner<ReqwestTransport> {
    /// Runner over a real HTTP client
    pub fn with_reqwest(options: RunOptions) -> Result<Self> {
        Ok(Self::new(ReqwestTransport::new()?, options))
    }
}

impl<T: HttpTransport> ScenarioRunner<T> {
    pub fn new(transport: T, options: RunOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run every step in order, stopping at the first failure
    pub async fn run(&self, scenario: &CompiledScenario, environment: &Environment) -> RunResult {
        let steps_total = scenario.steps.len();
        let budget = scenario.settings.timeout.unwrap_or(self.options.budget);
        let deadline = Instant::now() + budget;

        let scheme = if scenario.settings.ssl { "https" } else { "http" };
        let netloc = self.netloc(scenario);
        let mut ctx = ExecutionContext::new(environment, scheme, &netloc);

        info!(
            scenario = %scenario.name,
            steps = steps_total,
            budget_secs = budget.as_secs(),
            "Running scenario"
        );
        if self.options.echo {
            println!(
                "\n{} {}",
                "Running Scenario:".blue().bold(),
                scenario.name.white().bold()
            );
        }

        for step in &scenario.steps {
            if let Some(reason) = &step.skip {
                debug!(step = step.index, name = %step.name, reason = %reason, "Skipping step");
                if self.options.echo {
                    println!(
                        "  {} Step {}: {} (skipped: {})",
                        "-".yellow(),
                        step.index,
                        step.name.dimmed(),
                        reason
                    );
                }
                ctx.record(None);
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let outcome = if remaining.is_zero() {
                Err(Error::Timeout(budget.as_secs()))
            } else {
                match tokio::time::timeout(
                    remaining,
                    self.execute_step(scenario, step, &netloc, &mut ctx),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(Error::Timeout(budget.as_secs())),
                }
            };

            if let Err(e) = outcome {
                let detail = match e {
                    Error::StepAssertion { detail, .. } => detail,
                    other => other.to_string(),
                };
                warn!(
                    scenario = %scenario.name,
                    step = step.index,
                    name = %step.name,
                    "Step failed: {}",
                    detail
                );
                if self.options.echo {
                    println!("  {} Step {}: {}", "✗".red(), step.index, detail);
                }
                return RunResult {
                    scenario: scenario.name.clone(),
                    success: false,
                    steps_run: step.index,
                    steps_total,
                    first_failure: Some(StepFailure {
                        step: step.index,
                        name: step.name.clone(),
                        detail,
                    }),
                };
            }

            if self.options.echo {
                println!(
                    "  {} Step {}: {} {}",
                    "✓".green(),
                    step.index,
                    step.method.as_str().dimmed(),
                    step.name.dimmed()
                );
            }
        }

        info!(scenario = %scenario.name, "Scenario passed");
        if self.options.echo {
            println!("{} {}", "✓".green().bold(), "Scenario Passed".green().bold());
        }

        RunResult {
            scenario: scenario.name.clone(),
            success: true,
            steps_run: steps_total,
            steps_total,
            first_failure: None,
        }
    }

    fn netloc(&self, scenario: &CompiledScenario) -> String {
        let host = scenario
            .settings
            .host
            .as_deref()
            .or(self.options.host.as_deref())
            .unwrap_or("");
        match scenario.settings.port.or(self.options.port) {
            Some(port) if !host.is_empty() => format!("{}:{}", host, port),
            _ => host.to_string(),
        }
    }

    async fn execute_step(
        &self,
        scenario: &CompiledScenario,
        step: &Step,
        netloc: &str,
        ctx: &mut ExecutionContext<'_>,
    ) -> Result<()> {
        let fail = |detail: String| Error::assertion(step.index, &step.name, detail);
        let mut lookup = |read: &VarRead| ctx.resolve(read);

        let rendered_url = step.url.render(&mut lookup).map_err(fail)?;
        let url = resolve_url(&rendered_url, step.ssl, netloc).map_err(fail)?;

        let mut headers = Vec::with_capacity(step.headers.len() + 1);
        for (name, template) in &step.headers {
            headers.push((name.clone(), template.render(&mut lookup).map_err(fail)?));
        }

        let body = match &step.body {
            Some(template) => {
                let value = template.render(&mut lookup).map_err(fail)?;
                Some(match value {
                    Value::String(text) => text,
                    other => {
                        if !headers.iter().any(|(name, _)| name == "content-type") {
                            headers.push((
                                "content-type".to_string(),
                                "application/json".to_string(),
                            ));
                        }
                        serde_json::to_string(&other)?
                    }
                })
            }
            None => None,
        };

        debug!(step = step.index, method = %step.method, url = %url, "Sending request");

        let response = self
            .transport
            .send(HttpRequest {
                method: step.method.clone(),
                url,
                headers,
                body,
                cert_validate: scenario.settings.cert_validate,
            })
            .await?;

        debug!(step = step.index, status = response.status, "Received response");

        let json = check_response(step, &response, ctx).map_err(fail)?;

        for capture in &step.captures {
            let document = json.as_ref().ok_or_else(|| {
                fail(format!(
                    "cannot capture '{}': response body is not JSON",
                    capture.name
                ))
            })?;
            let value = capture.path.query(document).ok_or_else(|| {
                fail(format!(
                    "cannot capture '{}': JSON path '{}' not found in response",
                    capture.name, capture.path
                ))
            })?;
            debug!(step = step.index, capture = %capture.name, "Captured value");
            ctx.capture(&capture.name, value);
        }

        ctx.record(Some(StepRecord {
            status: response.status,
            headers: response.headers,
            body: response.body,
            json,
        }));

        Ok(())
    }
}

fn resolve_url(rendered: &str, ssl: bool, netloc: &str) -> std::result::Result<String, String> {
    if rendered.starts_with("http://") || rendered.starts_with("https://") {
        return Ok(rendered.to_string());
    }
    if netloc.is_empty() {
        return Err(format!(
            "relative URL '{}' needs a target host (set defaults.host or --host)",
            rendered
        ));
    }
    let scheme = if ssl { "https" } else { "http" };
    if rendered.starts_with('/') {
        Ok(format!("{}://{}{}", scheme, netloc, rendered))
    } else {
        Ok(format!("{}://{}/{}", scheme, netloc, rendered))
    }
}

/// Validate a response; returns its parsed JSON body when it has one
fn check_response(
    step: &Step,
    response: &HttpResponse,
    ctx: &ExecutionContext<'_>,
) -> std::result::Result<Option<Value>, String> {
    let mut lookup = |read: &VarRead| ctx.resolve(read);
    let expect = &step.expect;

    if !expect.status.contains(&response.status) {
        let expected = expect
            .status
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        return Err(format!(
            "expected status {}, got {}; response body: {}",
            expected,
            response.status,
            excerpt(&response.body)
        ));
    }

    for (name, template) in &expect.headers {
        let expected = template.render(&mut lookup)?;
        let actual = response
            .headers
            .get(name)
            .ok_or_else(|| format!("response header '{}' missing", name))?;
        if !text_matches(&expected, actual)? {
            return Err(format!(
                "response header '{}': expected '{}', got '{}'",
                name, expected, actual
            ));
        }
    }

    for template in &expect.strings {
        let expected = template.render(&mut lookup)?;
        if !response.body.contains(&expected) {
            return Err(format!(
                "response body does not contain '{}'; response body: {}",
                expected,
                excerpt(&response.body)
            ));
        }
    }

    let json = if response.body.trim().is_empty() {
        None
    } else {
        serde_json::from_str::<Value>(&response.body).ok()
    };

    if !expect.json_paths.is_empty() {
        let document = json.as_ref().ok_or_else(|| {
            format!(
                "response body is not JSON; response body: {}",
                excerpt(&response.body)
            )
        })?;
        for (path, expected) in &expect.json_paths {
            let actual = path
                .query(document)
                .ok_or_else(|| format!("JSON path '{}' not found in response", path))?;
            if !json_matches(expected, &actual, &mut lookup)? {
                let expected = expected.render(&mut lookup)?;
                return Err(format!(
                    "JSON path '{}': expected {}, got {}",
                    path, expected, actual
                ));
            }
        }
    }

    Ok(json)
}

fn json_matches<F>(
    expected: &JsonTemplate,
    actual: &Value,
    lookup: &mut F,
) -> std::result::Result<bool, String>
where
    F: FnMut(&VarRead) -> std::result::Result<Value, String>,
{
    let expected = expected.render(lookup)?;
    if let Value::String(pattern) = &expected {
        if as_regex(pattern).is_some() {
            return text_matches(pattern, &value_to_text(actual));
        }
    }
    Ok(values_match(&expected, actual))
}

/// Equality with numbers compared by value (`5 == 5.0`)
fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => numbers_match(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_match(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|w| values_match(v, w)))
        }
        _ => expected == actual,
    }
}

/// Integers compare exactly; floats only when either side is one
fn numbers_match(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    // mixed-sign integers never match
    (a.is_f64() || b.is_f64()) && a.as_f64() == b.as_f64()
}

/// `/pattern/` compiles to a regex; anything else is compared verbatim
fn text_matches(expected: &str, actual: &str) -> std::result::Result<bool, String> {
    match as_regex(expected) {
        Some(pattern) => Regex::new(pattern)
            .map(|re| re.is_match(actual))
            .map_err(|e| format!("invalid pattern '{}': {}", expected, e)),
        None => Ok(expected == actual),
    }
}

fn as_regex(text: &str) -> Option<&str> {
    if text.len() >= 2 {
        text.strip_prefix('/').and_then(|s| s.strip_suffix('/'))
    } else {
        None
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::compiler::compile;
    use crate::scenario::fixture::parse_fixture;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    /// Answers by URL and records every request
    #[derive(Default)]
    struct ScriptedTransport {
        responses: HashMap<String, (u16, String)>,
        calls: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn respond(mut self, url: &str, status: u16, body: &str) -> Self {
            self.responses
                .insert(url.to_string(), (status, body.to_string()));
            self
        }

        fn calls(&self) -> Vec<HttpRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.calls.lock().unwrap().push(request.clone());
            let (status, body) = self
                .responses
                .get(&request.url)
                .cloned()
                .ok_or_else(|| Error::Transport(format!("connection refused: {}", request.url)))?;
            let mut headers = BTreeMap::new();
            headers.insert("content-type".to_string(), "application/json".to_string());
            headers.insert("location".to_string(), format!("{}/created", request.url));
            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }

    fn runner(transport: ScriptedTransport) -> ScenarioRunner<ScriptedTransport> {
        ScenarioRunner::new(
            transport,
            RunOptions {
                host: Some("api.test".to_string()),
                ..RunOptions::default()
            },
        )
    }

    fn scenario(content: &str) -> CompiledScenario {
        compile(&parse_fixture("scenario.yaml", content, true).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_capture_feeds_next_request() {
        let transport = ScriptedTransport::default()
            .respond("http://api.test/items", 201, r#"{"id": 5}"#)
            .respond("http://api.test/items/5", 200, r#"{"id": 5, "name": "x"}"#);
        let runner = runner(transport);
        let compiled = scenario(
            r#"
tests:
  - name: create
    POST: /items
    status: 201
    capture:
      id: $.id
  - name: read
    GET: /items/$CAPTURE['id']
    response_json_paths:
      $.id: $CAPTURE['id']
      $.name: x
"#,
        );

        let result = runner.run(&compiled, &Environment::new()).await;
        assert!(result.success, "{:?}", result.diagnostic());
        assert!(result.diagnostic().is_none());
        assert_eq!(result.steps_run, 2);

        let calls = runner.transport().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].url, "http://api.test/items/5");
    }

    #[tokio::test]
    async fn test_failed_step_stops_the_scenario() {
        let transport = ScriptedTransport::default()
            .respond("http://api.test/1", 200, "{}")
            .respond("http://api.test/2", 200, "{}")
            .respond("http://api.test/3", 404, r#"{"error": "gone"}"#)
            .respond("http://api.test/4", 200, "{}")
            .respond("http://api.test/5", 200, "{}");
        let runner = runner(transport);
        let compiled = scenario(
            r#"
tests:
  - {name: one, GET: /1}
  - {name: two, GET: /2}
  - {name: three, GET: /3}
  - {name: four, GET: /4}
  - {name: five, GET: /5}
"#,
        );

        let result = runner.run(&compiled, &Environment::new()).await;
        assert!(!result.success);
        assert_eq!(result.steps_run, 3);
        let failure = result.first_failure.clone().unwrap();
        assert_eq!(failure.step, 3);
        assert_eq!(failure.name, "three");
        assert!(failure.detail.contains("expected status 200, got 404"));
        assert!(failure.detail.contains("gone"));

        let urls: Vec<String> = runner.transport().calls().into_iter().map(|c| c.url).collect();
        assert_eq!(urls, ["http://api.test/1", "http://api.test/2", "http://api.test/3"]);

        let diagnostic = result.diagnostic().unwrap();
        assert!(diagnostic.starts_with("From test \"three\" (step 3 of 5)"));
    }

    #[tokio::test]
    async fn test_producer_failure_blames_producer() {
        let transport = ScriptedTransport::default().respond("http://api.test/items", 500, "boom");
        let runner = runner(transport);
        let compiled = scenario(
            r#"
tests:
  - name: create
    POST: /items
    status: 201
    capture:
      id: $.id
  - name: read
    GET: /items/$CAPTURE['id']
"#,
        );

        let result = runner.run(&compiled, &Environment::new()).await;
        assert_eq!(result.first_failure.unwrap().name, "create");
        assert_eq!(runner.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_fails_step() {
        let runner = runner(ScriptedTransport::default());
        let compiled = scenario("tests:\n  - name: unreachable\n    GET: /nowhere\n");

        let result = runner.run(&compiled, &Environment::new()).await;
        let failure = result.first_failure.unwrap();
        assert_eq!(failure.step, 1);
        assert!(failure.detail.contains("connection refused"));
        assert_eq!(runner.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_environment_and_headers_are_rendered() {
        let transport =
            ScriptedTransport::default().respond("http://metric.test/v1/metric", 200, "[]");
        let runner = runner(transport);
        let compiled = scenario(
            r#"
defaults:
  request_headers:
    x-auth-token: $ENVIRON['TOKEN']
tests:
  - name: list
    GET: $ENVIRON['GNOCCHI_SERVICE_URL']/v1/metric
    response_headers:
      content-type: /json/
"#,
        );
        let env = Environment::new()
            .with("TOKEN", "secret")
            .with("GNOCCHI_SERVICE_URL", "http://metric.test");

        let result = runner.run(&compiled, &env).await;
        assert!(result.success, "{:?}", result.diagnostic());
        let calls = runner.transport().calls();
        assert!(calls[0]
            .headers
            .contains(&("x-auth-token".to_string(), "secret".to_string())));
    }

    #[tokio::test]
    async fn test_missing_environment_value_fails_before_sending() {
        let runner = runner(ScriptedTransport::default());
        let compiled = scenario("tests:\n  - name: a\n    GET: $ENVIRON['NOPE']/x\n");

        let result = runner.run(&compiled, &Environment::new()).await;
        assert!(result.first_failure.unwrap().detail.contains("NOPE"));
        assert!(runner.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_json_body_and_location() {
        let transport = ScriptedTransport::default()
            .respond("http://api.test/alarms", 201, r#"{"alarm_id": "a1", "threshold": 10.0}"#)
            .respond("http://api.test/alarms/created", 200, r#"{"alarm_id": "a1"}"#);
        let runner = runner(transport);
        let compiled = scenario(
            r#"
tests:
  - name: create
    POST: /alarms
    status: 201
    data:
      name: cpu_high
      threshold: 10
    response_json_paths:
      $.threshold: 10
      $.alarm_id: /^a\d$/
  - name: follow
    GET: $LOCATION
    response_json_paths:
      $.alarm_id: $HISTORY['create'].$RESPONSE['$.alarm_id']
"#,
        );

        let result = runner.run(&compiled, &Environment::new()).await;
        assert!(result.success, "{:?}", result.diagnostic());

        let calls = runner.transport().calls();
        let sent: Value = serde_json::from_str(calls[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, json!({"name": "cpu_high", "threshold": 10}));
        assert!(calls[0]
            .headers
            .contains(&("content-type".to_string(), "application/json".to_string())));
    }

    #[tokio::test]
    async fn test_json_path_mismatch_detail() {
        let transport =
            ScriptedTransport::default().respond("http://api.test/a", 200, r#"{"state": "ok"}"#);
        let runner = runner(transport);
        let compiled = scenario(
            "tests:\n  - name: state\n    GET: /a\n    response_json_paths:\n      $.state: alarm\n",
        );

        let result = runner.run(&compiled, &Environment::new()).await;
        let detail = result.first_failure.unwrap().detail;
        assert_eq!(detail, "JSON path '$.state': expected \"alarm\", got \"ok\"");
    }

    #[tokio::test]
    async fn test_skipped_step_sends_nothing() {
        let transport = ScriptedTransport::default().respond("http://api.test/b", 200, "{}");
        let runner = runner(transport);
        let compiled = scenario(
            "tests:\n  - name: a\n    GET: /a\n    skip: not deployed\n  - name: b\n    GET: /b\n",
        );

        let result = runner.run(&compiled, &Environment::new()).await;
        assert!(result.success);
        assert_eq!(runner.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_relative_url_without_host() {
        let runner = ScenarioRunner::new(ScriptedTransport::default(), RunOptions::default());
        let compiled = scenario("tests:\n  - name: a\n    GET: /a\n");

        let result = runner.run(&compiled, &Environment::new()).await;
        assert!(result.first_failure.unwrap().detail.contains("needs a target host"));
    }

    #[tokio::test]
    async fn test_exhausted_budget_fails_current_step() {
        let transport = ScriptedTransport::default().respond("http://api.test/a", 200, "{}");
        let runner = ScenarioRunner::new(
            transport,
            RunOptions {
                host: Some("api.test".to_string()),
                budget: Duration::ZERO,
                ..RunOptions::default()
            },
        );
        let compiled = scenario("tests:\n  - name: a\n    GET: /a\n");

        let result = runner.run(&compiled, &Environment::new()).await;
        let failure = result.first_failure.unwrap();
        assert_eq!(failure.step, 1);
        assert!(failure.detail.contains("timed out"));
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("https://x.test/a", false, "").unwrap(),
            "https://x.test/a"
        );
        assert_eq!(
            resolve_url("/a", true, "x.test:8443").unwrap(),
            "https://x.test:8443/a"
        );
        assert_eq!(resolve_url("a", false, "x.test").unwrap(), "http://x.test/a");
        assert!(resolve_url("/a", false, "").is_err());
    }

    #[test]
    fn test_values_match_numbers_by_value() {
        assert!(values_match(&json!(5), &json!(5.0)));
        assert!(values_match(&json!({"a": [1, 2]}), &json!({"a": [1.0, 2]})));
        assert!(!values_match(&json!("5"), &json!(5)));
        assert!(!values_match(&json!([1]), &json!([1, 2])));
    }

    #[test]
    fn test_values_match_large_integers_exactly() {
        assert!(!values_match(&json!(9007199254740993_i64), &json!(9007199254740992_i64)));
        assert!(values_match(&json!(9007199254740993_i64), &json!(9007199254740993_i64)));
        assert!(values_match(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!values_match(&json!(-1), &json!(u64::MAX)));
    }

    #[test]
    fn test_text_matches() {
        assert!(text_matches("/^appl/", "application/json").unwrap());
        assert!(!text_matches("/^json/", "application/json").unwrap());
        assert!(text_matches("exact", "exact").unwrap());
        assert!(text_matches("/(/", "x").is_err());
        assert!(text_matches("/", "/").unwrap());
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(1000);
        let cut = excerpt(&long);
        assert_eq!(cut.len(), BODY_EXCERPT_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(excerpt("  short  "), "short");
    }
}
