//! Environment bridges
//!
//! A bridge prepares the [`Environment`] a test case reads through
//! `$ENVIRON['NAME']`, or decides the case must be skipped. Scenario
//! files never read the process environment directly; only
//! [`ProcessEnvBridge`] does.

pub mod catalog;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::registrar::TestCase;
use crate::scenario::Environment;

pub use catalog::ServiceCatalog;

/// What a bridge decided for one test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preparation {
    Ready(Environment),
    Skip(String),
}

/// Supplies the dynamic context of a test case
#[async_trait]
pub trait EnvironmentBridge: Send + Sync {
    async fn prepare(&self, case: &TestCase) -> Result<Preparation>;
}

/// Hands every case the same fixed environment
#[derive(Debug, Clone, Default)]
pub struct StaticBridge {
    environment: Environment,
}

impl StaticBridge {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }
}

#[async_trait]
impl EnvironmentBridge for StaticBridge {
    async fn prepare(&self, _case: &TestCase) -> Result<Preparation> {
        Ok(Preparation::Ready(self.environment.clone()))
    }
}

/// Snapshots process environment variables when a case is prepared
#[derive(Debug, Clone, Default)]
pub struct ProcessEnvBridge {
    /// `None` takes every variable
    names: Option<Vec<String>>,
    overrides: Environment,
}

impl ProcessEnvBridge {
    /// Take every process environment variable
    pub fn all() -> Self {
        Self::default()
    }

    /// Take only the named variables; missing ones are left out
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
            overrides: Environment::new(),
        }
    }

    /// Values that win over the process environment
    pub fn with_overrides(mut self, overrides: Environment) -> Self {
        self.overrides = overrides;
        self
    }

    fn snapshot(&self) -> Environment {
        let mut environment: Environment = match &self.names {
            None => std::env::vars().collect(),
            Some(names) => names
                .iter()
                .filter_map(|name| std::env::var(name).ok().map(|v| (name.clone(), v)))
                .collect(),
        };
        environment.merge(self.overrides.clone());
        environment
    }
}

#[async_trait]
impl EnvironmentBridge for ProcessEnvBridge {
    async fn prepare(&self, _case: &TestCase) -> Result<Preparation> {
        Ok(Preparation::Ready(self.snapshot()))
    }
}

/// Which scenario suite a [`TelemetryBridge`] prepares for
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SuiteProfile {
    /// Metric API scenarios, run with admin credentials
    Gnocchi,
    /// Autoscaling across compute, orchestration, metric and alarming
    Integration,
    /// Autoscaling with alarms evaluated against Prometheus
    Prometheus,
}

impl SuiteProfile {
    /// Services that must be marked available in `[service_available]`
    pub fn required_services(&self) -> &'static [&'static str] {
        match self {
            SuiteProfile::Gnocchi => &["gnocchi"],
            SuiteProfile::Integration => {
                &["aodh", "gnocchi", "nova", "heat", "ceilometer", "glance"]
            }
            SuiteProfile::Prometheus => {
                &["aodh", "nova", "heat", "ceilometer", "glance", "sg_core"]
            }
        }
    }
}

/// A token and the service catalog that came with it
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: String,
    pub catalog: ServiceCatalog,
}

impl Credentials {
    pub fn new(token: impl Into<String>, catalog: ServiceCatalog) -> Self {
        Self {
            token: token.into(),
            catalog,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCredentials {
    token: String,
    catalog: Value,
}

impl TryFrom<RawCredentials> for Credentials {
    type Error = Error;

    fn try_from(raw: RawCredentials) -> Result<Self> {
        Ok(Self::new(raw.token, ServiceCatalog::from_json(raw.catalog)?))
    }
}

/// Credentials document produced by the deployment tooling
///
/// ```json
/// {
///   "admin": {"token": "...", "catalog": {"token": {"catalog": []}}},
///   "user": {"token": "...", "catalog": {"token": {"catalog": []}}},
///   "resources": {"GLANCE_IMAGE_NAME": "cirros", "NOVA_FLAVOR_REF": "1"}
/// }
/// ```
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    admin: Option<RawCredentials>,
    user: RawCredentials,
    #[serde(default)]
    resources: BTreeMap<String, String>,
}

/// Prepares the telemetry integration suites
///
/// Skips a case when a required service is not deployed, resolves service
/// URLs from the catalogs and publishes the values scenario files expect.
/// Every prepared case gets a fresh `STACK_NAME`.
#[derive(Debug, Clone)]
pub struct TelemetryBridge {
    profile: SuiteProfile,
    config: Config,
    admin: Option<Credentials>,
    user: Credentials,
    /// Ids of resources created outside the harness (image, flavor, network)
    resources: BTreeMap<String, String>,
}

impl TelemetryBridge {
    pub fn new(profile: SuiteProfile, config: Config, user: Credentials) -> Self {
        Self {
            profile,
            config,
            admin: None,
            user,
            resources: BTreeMap::new(),
        }
    }

    pub fn with_admin(mut self, admin: Credentials) -> Self {
        self.admin = Some(admin);
        self
    }

    pub fn with_resource(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.resources.insert(key.into(), value.into());
        self
    }

    /// Build a bridge from a JSON credentials file
    pub fn from_credentials_file(
        profile: SuiteProfile,
        config: Config,
        path: &Path,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let file: CredentialsFile = serde_json::from_str(&content)?;

        let mut bridge = Self::new(profile, config, file.user.try_into()?);
        if let Some(admin) = file.admin {
            bridge = bridge.with_admin(admin.try_into()?);
        }
        bridge.resources = file.resources;
        Ok(bridge)
    }

    pub fn profile(&self) -> SuiteProfile {
        self.profile
    }

    fn admin(&self) -> Result<&Credentials> {
        self.admin.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "admin credentials are required for the {:?} suite",
                self.profile
            ))
        })
    }

    /// First required service that is not deployed
    fn missing_service(&self) -> Option<&'static str> {
        self.profile
            .required_services()
            .iter()
            .copied()
            .find(|name| !self.config.service_available.is_available(name))
    }

    fn environment(&self) -> Result<Environment> {
        let telemetry = &self.config.telemetry;
        let user = &self.user;
        let mut env = Environment::new();

        match self.profile {
            SuiteProfile::Gnocchi => {
                let admin = self.admin()?;
                env.insert("GNOCCHI_SERVICE_URL", admin.catalog.endpoint(&self.config.metric)?);
                env.insert("GNOCCHI_SERVICE_TOKEN", admin.token.clone());
                env.insert("GNOCCHI_AUTHORIZATION", "not used");
            }
            SuiteProfile::Integration => {
                env.insert("ADMIN_TOKEN", self.admin()?.token.clone());
                env.insert("USER_TOKEN", user.token.clone());
                env.insert("CEILOMETER_METRIC_NAME", telemetry.alarm_metric_name.clone());
                env.insert(
                    "GNOCCHI_AGGREGATION_METHOD",
                    telemetry.alarm_aggregation_method.clone(),
                );
                env.insert("AODH_THRESHOLD", telemetry.alarm_threshold.to_string());
                env.insert("AODH_GRANULARITY", telemetry.alarm_granularity.to_string());
                env.insert(
                    "AODH_SERVICE_URL",
                    user.catalog.endpoint(&self.config.alarming_plugin.endpoint)?,
                );
                env.insert("GNOCCHI_SERVICE_URL", user.catalog.endpoint(&self.config.metric)?);
                env.insert("HEAT_SERVICE_URL", user.catalog.endpoint(&self.config.heat_plugin)?);
                env.insert("NOVA_SERVICE_URL", user.catalog.endpoint(&self.config.compute)?);
                env.insert("GLANCE_SERVICE_URL", user.catalog.endpoint(&self.config.image)?);
                env.insert("SG_CORE_SERVICE_URL", telemetry.sg_core_service_url.clone());
                env.insert("STACK_NAME", stack_name());
            }
            SuiteProfile::Prometheus => {
                let stack = stack_name();
                env.insert("USER_TOKEN", user.token.clone());
                env.insert("AODH_THRESHOLD", telemetry.alarm_threshold.to_string());
                env.insert(
                    "SCALEDOWN_THRESHOLD",
                    telemetry.scaledown_alarm_threshold.to_string(),
                );
                env.insert(
                    "AODH_SERVICE_URL",
                    user.catalog.endpoint(&self.config.alarming_plugin.endpoint)?,
                );
                env.insert("HEAT_SERVICE_URL", user.catalog.endpoint(&self.config.heat_plugin)?);
                env.insert("NOVA_SERVICE_URL", user.catalog.endpoint(&self.config.compute)?);
                env.insert("SG_CORE_SERVICE_URL", telemetry.sg_core_service_url.clone());
                env.insert(
                    "CEILOMETER_POLLING_INTERVAL",
                    telemetry.ceilometer_polling_interval.to_string(),
                );
                if let Some(url) = &telemetry.prometheus_service_url {
                    env.insert("PROMETHEUS_SERVICE_URL", url.clone());
                }
                env.insert("RESOURCE_PREFIX", resource_prefix(&stack));
                env.insert("STACK_NAME", stack);
            }
        }

        for (key, value) in &self.resources {
            env.insert(key.clone(), value.clone());
        }
        Ok(env)
    }
}

#[async_trait]
impl EnvironmentBridge for TelemetryBridge {
    async fn prepare(&self, case: &TestCase) -> Result<Preparation> {
        if let Some(service) = self.missing_service() {
            debug!(case = %case.name, service, "Required service unavailable");
            return Ok(Preparation::Skip(format!(
                "{} support is required",
                capitalize(service)
            )));
        }
        let environment = self.environment()?;
        debug!(case = %case.name, values = environment.len(), "Prepared environment");
        Ok(Preparation::Ready(environment))
    }
}

/// Random stack name, `telemetry-` followed by eight hex digits
fn stack_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("telemetry-{}", &id[..8])
}

/// Orchestration names autoscaling resources after the last 7 characters
/// of the stack name
fn resource_prefix(stack_name: &str) -> String {
    let chars: Vec<char> = stack_name.chars().collect();
    chars[chars.len().saturating_sub(7)..].iter().collect()
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
