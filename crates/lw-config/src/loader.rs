//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "leasewarden.toml",
    "./config/config.toml",
    "./config/leasewarden.toml",
    "/etc/leasewarden/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        // Start with defaults
        let mut config = AppConfig::default();

        // Try to load from file
        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        // Apply environment variable overrides
        self.apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        // Check explicit path first
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        // Check LEASEWARDEN_CONFIG env var
        if let Ok(path) = env::var("LEASEWARDEN_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // Search standard paths
        for path in CONFIG_PATHS {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&self, config: &mut AppConfig) {
        // Election
        if let Ok(val) = env::var("LEASEWARDEN_LEASE_NAME") {
            config.election.lease_name = val;
        }
        if let Ok(val) = env::var("LEASEWARDEN_NAMESPACE") {
            config.election.namespace = val;
        }
        if let Ok(val) = env::var("LEASEWARDEN_INTERVAL_SECONDS") {
            if let Ok(interval) = val.parse() {
                config.election.interval_seconds = interval;
            }
        }
        if let Ok(val) = env::var("LEASEWARDEN_RENEW_RETRY_BUDGET") {
            if let Ok(budget) = val.parse() {
                config.election.renew_retry_budget = budget;
            }
        }

        // Kubernetes API
        if let Ok(val) = env::var("LEASEWARDEN_KUBE_API_URL") {
            config.kube.api_url = val;
        }
        if let Ok(val) = env::var("LEASEWARDEN_KUBE_TOKEN_PATH") {
            config.kube.token_path = val;
        }
        if let Ok(val) = env::var("LEASEWARDEN_KUBE_CA_CERT_PATH") {
            config.kube.ca_cert_path = val;
        }
        if let Ok(val) = env::var("LEASEWARDEN_KUBE_REQUEST_TIMEOUT_MS") {
            if let Ok(timeout) = val.parse() {
                config.kube.request_timeout_ms = timeout;
            }
        }

        // Metrics
        if let Ok(val) = env::var("LEASEWARDEN_METRICS_ENABLED") {
            config.metrics.enabled = val.parse().unwrap_or(false);
        }
        if let Ok(val) = env::var("LEASEWARDEN_METRICS_LISTEN_ADDR") {
            config.metrics.listen_addr = val;
        }

        // General
        if let Ok(val) = env::var("LEASEWARDEN_DEV_MODE") {
            config.dev_mode = val.parse().unwrap_or(false);
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
