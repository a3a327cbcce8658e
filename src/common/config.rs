//! Configuration file handling
//!
//! Option groups follow the telemetry integration suite: which services
//! are deployed, how to find them in the service catalog, and the
//! thresholds scenario files interpolate.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Which services are expected to be deployed
    #[serde(default)]
    pub service_available: ServiceAvailable,

    /// Telemetry thresholds and timing
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Backends behind the telemetry services
    #[serde(default)]
    pub telemetry_services: TelemetryServices,

    /// Event service catalog entry
    #[serde(default)]
    pub event: ServiceEndpoint,

    /// Alarming service catalog entry
    #[serde(default)]
    pub alarming_plugin: AlarmingConfig,

    /// Metric service catalog entry
    #[serde(default)]
    pub metric: ServiceEndpoint,

    /// Orchestration service catalog entry
    #[serde(default)]
    pub heat_plugin: ServiceEndpoint,

    /// Compute service catalog entry
    #[serde(default)]
    pub compute: ServiceEndpoint,

    /// Image service catalog entry
    #[serde(default)]
    pub image: ServiceEndpoint,

    /// Scenario execution settings
    #[serde(default)]
    pub harness: HarnessConfig,
}

/// Service availability flags
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceAvailable {
    #[serde(default = "enabled")]
    pub ceilometer: bool,
    #[serde(default = "enabled")]
    pub aodh: bool,
    #[serde(default = "enabled")]
    pub gnocchi: bool,
    #[serde(default)]
    pub sg_core: bool,
    #[serde(default = "enabled")]
    pub nova: bool,
    #[serde(default = "enabled")]
    pub heat: bool,
    #[serde(default = "enabled")]
    pub glance: bool,
}

impl Default for ServiceAvailable {
    fn default() -> Self {
        Self {
            ceilometer: true,
            aodh: true,
            gnocchi: true,
            sg_core: false,
            nova: true,
            heat: true,
            glance: true,
        }
    }
}

impl ServiceAvailable {
    /// Look up a service flag by name; unknown services count as unavailable
    pub fn is_available(&self, name: &str) -> bool {
        match name {
            "ceilometer" => self.ceilometer,
            "aodh" => self.aodh,
            "gnocchi" => self.gnocchi,
            "sg_core" => self.sg_core,
            "nova" => self.nova,
            "heat" => self.heat,
            "glance" => self.glance,
            _ => false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            service_available: ServiceAvailable::default(),
            telemetry: TelemetryConfig::default(),
            telemetry_services: TelemetryServices::default(),
            event: ServiceEndpoint::default(),
            alarming_plugin: AlarmingConfig::default(),
            metric: ServiceEndpoint::default(),
            heat_plugin: ServiceEndpoint::default(),
            compute: ServiceEndpoint::default(),
            image: ServiceEndpoint::default(),
            harness: HarnessConfig::default(),
        };
        config.fill_catalog_types();
        config
    }
}

fn enabled() -> bool {
    true
}

/// Telemetry thresholds and timing
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelemetryConfig {
    /// Seconds to wait for notifications
    #[serde(default = "default_notification_wait")]
    pub notification_wait: u64,

    /// Seconds to sleep after an unsuccessful notification check
    #[serde(default = "default_notification_sleep")]
    pub notification_sleep: u64,

    /// Alarm granularity; must match the metric archive policy
    #[serde(default = "default_alarm_granularity")]
    pub alarm_granularity: u64,

    /// Metric the alarm is created on
    #[serde(default = "default_alarm_metric_name")]
    pub alarm_metric_name: String,

    /// Aggregation method used by the alarm
    #[serde(default = "default_alarm_aggregation_method")]
    pub alarm_aggregation_method: String,

    /// Threshold to cross for the alarm to trigger
    #[serde(default = "default_alarm_threshold")]
    pub alarm_threshold: i64,

    /// Threshold for the scale-down alarm
    #[serde(default = "default_scaledown_alarm_threshold")]
    pub scaledown_alarm_threshold: i64,

    /// Disable certificate validation for scenario requests
    #[serde(default)]
    pub disable_ssl_certificate_validation: bool,

    /// Prometheus endpoint exposed by sg-core
    #[serde(default = "default_sg_core_service_url")]
    pub sg_core_service_url: String,

    /// Polling interval configured for ceilometer
    #[serde(default = "default_polling_interval")]
    pub ceilometer_polling_interval: u64,

    /// Prometheus query endpoint for the prometheus suite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus_service_url: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            notification_wait: default_notification_wait(),
            notification_sleep: default_notification_sleep(),
            alarm_granularity: default_alarm_granularity(),
            alarm_metric_name: default_alarm_metric_name(),
            alarm_aggregation_method: default_alarm_aggregation_method(),
            alarm_threshold: default_alarm_threshold(),
            scaledown_alarm_threshold: default_scaledown_alarm_threshold(),
            disable_ssl_certificate_validation: false,
            sg_core_service_url: default_sg_core_service_url(),
            ceilometer_polling_interval: default_polling_interval(),
            prometheus_service_url: None,
        }
    }
}

fn default_notification_wait() -> u64 {
    120
}
fn default_notification_sleep() -> u64 {
    1
}
fn default_alarm_granularity() -> u64 {
    300
}
fn default_alarm_metric_name() -> String {
    "cpu".to_string()
}
fn default_alarm_aggregation_method() -> String {
    "rate:mean".to_string()
}
fn default_alarm_threshold() -> i64 {
    10
}
fn default_scaledown_alarm_threshold() -> i64 {
    2_000_000_000
}
fn default_sg_core_service_url() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_polling_interval() -> u64 {
    300
}

/// Storage backends of the telemetry services
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TelemetryServices {
    /// Backends used to store metrics (gnocchi, prometheus)
    #[serde(default)]
    pub metric_backends: Vec<String>,

    /// Database used by the alarming service (mysql, postgresql)
    #[serde(default = "default_alarm_backend")]
    pub alarm_backend: String,
}

impl Default for TelemetryServices {
    fn default() -> Self {
        Self {
            metric_backends: Vec::new(),
            alarm_backend: default_alarm_backend(),
        }
    }
}

fn default_alarm_backend() -> String {
    "mysql".to_string()
}

const METRIC_BACKENDS: &[&str] = &["gnocchi", "prometheus"];
const ALARM_BACKENDS: &[&str] = &["mysql", "postgresql"];
const ENDPOINT_TYPES: &[&str] = &[
    "public",
    "admin",
    "internal",
    "publicURL",
    "adminURL",
    "internalURL",
];

/// Where a service lives in the identity service catalog
///
/// An empty `catalog_type` is replaced by the option group's default
/// when the configuration is loaded.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ServiceEndpoint {
    /// Catalog type of the service
    #[serde(default)]
    pub catalog_type: String,

    /// Endpoint interface: public, admin or internal (optionally with `URL` suffix)
    #[serde(default = "default_endpoint_type")]
    pub endpoint_type: String,
}

impl ServiceEndpoint {
    fn new(catalog_type: &str) -> Self {
        Self {
            catalog_type: catalog_type.to_string(),
            endpoint_type: default_endpoint_type(),
        }
    }

    fn or_catalog_type(&mut self, catalog_type: &str) {
        if self.catalog_type.is_empty() {
            self.catalog_type = catalog_type.to_string();
        }
        if self.endpoint_type.is_empty() {
            self.endpoint_type = default_endpoint_type();
        }
    }
}

fn default_endpoint_type() -> String {
    "publicURL".to_string()
}

/// Alarming service catalog entry and setup switch
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlarmingConfig {
    #[serde(flatten)]
    pub endpoint: ServiceEndpoint,

    /// Create alarms dynamically before a suite runs
    #[serde(default = "enabled")]
    pub create_alarms: bool,
}

impl Default for AlarmingConfig {
    fn default() -> Self {
        Self {
            endpoint: ServiceEndpoint::new("alarming"),
            create_alarms: true,
        }
    }
}

/// Scenario execution settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HarnessConfig {
    /// Base time budget for one scenario, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Multiplier applied to `timeout_secs` for slow environments
    #[serde(default = "default_scaling_factor")]
    pub timeout_scaling_factor: u32,

    /// File extension of scenario files
    #[serde(default = "default_fixture_extension")]
    pub fixture_extension: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            timeout_scaling_factor: default_scaling_factor(),
            fixture_extension: default_fixture_extension(),
        }
    }
}

impl HarnessConfig {
    /// Effective per-scenario budget in seconds
    pub fn scenario_budget_secs(&self) -> u64 {
        self.timeout_secs
            .saturating_mul(u64::from(self.timeout_scaling_factor.max(1)))
    }
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_scaling_factor() -> u32 {
    5
}
fn default_fixture_extension() -> String {
    "yaml".to_string()
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse, complete and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.fill_catalog_types();
        config.validate()?;
        Ok(config)
    }

    fn fill_catalog_types(&mut self) {
        self.event.or_catalog_type("event");
        self.alarming_plugin.endpoint.or_catalog_type("alarming");
        self.metric.or_catalog_type("metric");
        self.heat_plugin.or_catalog_type("orchestration");
        self.compute.or_catalog_type("compute");
        self.image.or_catalog_type("image");
    }

    /// Reject option values outside their allowed choices
    pub fn validate(&self) -> Result<()> {
        for backend in &self.telemetry_services.metric_backends {
            if !METRIC_BACKENDS.contains(&backend.as_str()) {
                return Err(Error::Config(format!(
                    "Unknown metric backend '{}'. Supported: {}",
                    backend,
                    METRIC_BACKENDS.join(", ")
                )));
            }
        }

        if !ALARM_BACKENDS.contains(&self.telemetry_services.alarm_backend.as_str()) {
            return Err(Error::Config(format!(
                "Unknown alarm backend '{}'. Supported: {}",
                self.telemetry_services.alarm_backend,
                ALARM_BACKENDS.join(", ")
            )));
        }

        for (group, endpoint) in self.endpoints() {
            if !ENDPOINT_TYPES.contains(&endpoint.endpoint_type.as_str()) {
                return Err(Error::Config(format!(
                    "[{}] endpoint_type '{}' must be one of: {}",
                    group,
                    endpoint.endpoint_type,
                    ENDPOINT_TYPES.join(", ")
                )));
            }
        }

        if self.harness.fixture_extension.is_empty() {
            return Err(Error::Config(
                "[harness] fixture_extension must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Catalog entries keyed by their option group name
    pub fn endpoints(&self) -> [(&'static str, &ServiceEndpoint); 6] {
        [
            ("event", &self.event),
            ("alarming_plugin", &self.alarming_plugin.endpoint),
            ("metric", &self.metric),
            ("heat_plugin", &self.heat_plugin),
            ("compute", &self.compute),
            ("image", &self.image),
        ]
    }

    /// Certificate validation policy applied to scenarios that don't set one
    pub fn cert_validate(&self) -> bool {
        !self.telemetry.disable_ssl_certificate_validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert!(config.service_available.aodh);
        assert!(!config.service_available.sg_core);
        assert_eq!(config.telemetry.alarm_granularity, 300);
        assert_eq!(config.telemetry.alarm_aggregation_method, "rate:mean");
        assert_eq!(config.alarming_plugin.endpoint.catalog_type, "alarming");
        assert_eq!(config.metric.endpoint_type, "publicURL");
        assert!(config.cert_validate());
        assert_eq!(config.harness.scenario_budget_secs(), 300);
        assert_eq!(config.heat_plugin.catalog_type, "orchestration");
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [telemetry]
            alarm_threshold = 42
            disable_ssl_certificate_validation = true

            [alarming_plugin]
            endpoint_type = "internal"
            create_alarms = false
            "#,
        )
        .unwrap();
        assert_eq!(config.telemetry.alarm_threshold, 42);
        assert_eq!(config.telemetry.alarm_metric_name, "cpu");
        assert!(!config.cert_validate());
        assert_eq!(config.alarming_plugin.endpoint.endpoint_type, "internal");
        assert_eq!(config.alarming_plugin.endpoint.catalog_type, "alarming");
        assert!(!config.alarming_plugin.create_alarms);
    }

    #[test]
    fn test_validate_rejects_unknown_choices() {
        let mut config = Config::default();
        config.telemetry_services.metric_backends = vec!["influx".to_string()];
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.compute.endpoint_type = "private".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[compute]"));
    }

    #[test]
    fn test_scaling_factor_zero_counts_as_one() {
        let harness = HarnessConfig {
            timeout_secs: 30,
            timeout_scaling_factor: 0,
            fixture_extension: "yaml".to_string(),
        };
        assert_eq!(harness.scenario_budget_secs(), 30);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[harness]\ntimeout_secs = 10\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.harness.timeout_secs, 10);
        assert_eq!(config.harness.timeout_scaling_factor, 5);

        std::fs::write(&path, "[harness\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(Error::ConfigParse(_))
        ));
    }
}
