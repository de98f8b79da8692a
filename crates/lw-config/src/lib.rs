//! LeaseWarden Configuration System
//!
//! This crate provides TOML-based configuration with environment variable override support.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub election: ElectionSettings,
    pub kube: KubeSettings,
    pub metrics: MetricsSettings,

    /// Enable development mode (in-memory lease store, relaxed identity)
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            election: ElectionSettings::default(),
            kube: KubeSettings::default(),
            metrics: MetricsSettings::default(),
            dev_mode: false,
        }
    }
}

/// Leader election settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionSettings {
    /// Name of the lease all candidates race for
    pub lease_name: String,
    /// Namespace holding the lease (empty: POD_NAMESPACE, or "default" in
    /// dev mode)
    pub namespace: String,
    /// Seconds between acquisition attempts and between renewals
    pub interval_seconds: u64,
    /// Backoff schedule for transient remote-call failures, in milliseconds
    pub retry_backoff_ms: Vec<u64>,
    /// Retry budget for renewals (kept small so a stuck leader steps down fast)
    pub renew_retry_budget: usize,
}

impl Default for ElectionSettings {
    fn default() -> Self {
        Self {
            lease_name: "leasewarden".to_string(),
            namespace: String::new(),
            interval_seconds: 30,
            retry_backoff_ms: vec![100, 500, 1000, 2000, 4000],
            renew_retry_budget: 2,
        }
    }
}

/// Kubernetes API access settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeSettings {
    /// API server base URL (empty: discover from the in-cluster environment)
    pub api_url: String,
    /// Path to the service account bearer token
    pub token_path: String,
    /// Path to the cluster CA bundle
    pub ca_cert_path: String,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for KubeSettings {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            token_path: "/var/run/secrets/kubernetes.io/serviceaccount/token".to_string(),
            ca_cert_path: "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt".to_string(),
            connect_timeout_ms: 5000,
            request_timeout_ms: 15000,
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Serve Prometheus metrics from the agent
    pub enabled: bool,
    /// Listen address for the exporter
    pub listen_addr: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "0.0.0.0:9090".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        let loader = ConfigLoader::new();
        loader.load()
    }

    /// Reject configurations the election cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.election.lease_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "election.lease_name must not be empty".to_string(),
            ));
        }
        if self.election.interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "election.interval_seconds must be positive".to_string(),
            ));
        }
        if self.metrics.enabled && self.metrics.listen_addr.is_empty() {
            return Err(ConfigError::ValidationError(
                "metrics.listen_addr must be set when metrics are enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# LeaseWarden Configuration
# Environment variables override these settings

dev_mode = false

[election]
lease_name = "leasewarden"
namespace = ""              # empty: POD_NAMESPACE (or "default" in dev mode)
interval_seconds = 30
retry_backoff_ms = [100, 500, 1000, 2000, 4000]
renew_retry_budget = 2

[kube]
api_url = ""                # empty: in-cluster discovery
token_path = "/var/run/secrets/kubernetes.io/serviceaccount/token"
ca_cert_path = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt"
connect_timeout_ms = 5000
request_timeout_ms = 15000

[metrics]
enabled = false
listen_addr = "0.0.0.0:9090"
"#
        .to_string()
    }
}
