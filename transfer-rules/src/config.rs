//! Configuration for the rule engine

use serde::{Deserialize, Serialize};

/// Rule engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Source pattern index configuration
    pub index: IndexConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "transfer-rules".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            index: IndexConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Source pattern index configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Bucket source patterns by literal name.
    /// Disabling falls back to scanning every source pattern.
    pub enabled: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Record Prometheus metrics
    pub enabled: bool,

    /// Metric name prefix
    pub namespace: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "transfer_rules".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(enabled) = std::env::var("TRANSFER_RULES_INDEX") {
            config.index.enabled = parse_flag("TRANSFER_RULES_INDEX", &enabled)?;
        }

        if let Ok(enabled) = std::env::var("TRANSFER_RULES_METRICS") {
            config.metrics.enabled = parse_flag("TRANSFER_RULES_METRICS", &enabled)?;
        }

        if let Ok(namespace) = std::env::var("TRANSFER_RULES_METRICS_NAMESPACE") {
            config.metrics.namespace = namespace;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value constraints
    pub fn validate(&self) -> crate::Result<()> {
        let namespace = &self.metrics.namespace;
        let valid = !namespace.is_empty()
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !namespace.starts_with(|c: char| c.is_ascii_digit());

        if !valid {
            return Err(crate::Error::Config(format!(
                "metrics namespace '{}' is not a valid Prometheus name",
                namespace
            )));
        }
        Ok(())
    }
}

fn parse_flag(var: &str, value: &str) -> crate::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(crate::Error::Config(format!(
            "{} must be a boolean, got '{}'",
            var, value
        ))),
    }
}
