//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `ALERTING_CONFIG` env var
//! 3. **Environment variables**: `ALERTING__SECTION__FIELD` override specific fields
//!
//! # Configuration Sections
//!
//! - [`BrokerConfig`]: stream backend carrying the intake, store and event topics
//! - [`StorageConfig`]: snapshot store backend, key prefix and expiry
//! - [`Topics`]: topic names
//! - [`ProcessorConfig`]: worker count, queue sizing, failure and retry policy
//! - [`MetricsConfig`]: Prometheus exporter
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! [broker]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//!
//! [storage]
//! backend = "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! ttl_seconds = 86400
//!
//! [processor]
//! workers = 4
//! failure_policy = "halt"
//! ```

use std::{collections::HashSet, path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    ports::Topics,
    processor::{FailurePolicy, ProcessorOptions, RetryConfig, RetryPolicy},
};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "ALERTING_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Driver selection for a port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process; state is lost on restart and not shared between processes.
    #[default]
    Memory,
    Redis,
}

impl Backend {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub backend: Backend,

    /// Required when `backend = "redis"`.
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: Backend,

    /// Required when `backend = "redis"`.
    pub redis_url: Option<String>,

    /// Prepended to alert ids as `{prefix}:{id}`. Empty means no prefix.
    pub key_prefix: String,

    /// Snapshot expiry in seconds. `0` disables expiry.
    pub ttl_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            redis_url: None,
            key_prefix: "alert".to_string(),
            ttl_seconds: 0,
        }
    }
}

/// Reconciliation worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Independent processors. Each alert id is always routed to the same one.
    pub workers: usize,

    /// Bounded queue length in front of each worker.
    pub queue_capacity: usize,

    /// Publish persisted snapshots on the store topic as well.
    pub mirror_to_store_topic: bool,

    /// Emit an `event`/`alert` event when an alert re-fires.
    pub report_refire: bool,

    pub failure_policy: FailurePolicy,

    pub retry: RetryConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
            mirror_to_store_topic: true,
            report_refire: false,
            failure_policy: FailurePolicy::Report,
            retry: RetryConfig::default(),
        }
    }
}

/// Prometheus metrics export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether the exporter is installed. Defaults to `true`.
    pub enabled: bool,

    /// Port of the Prometheus HTTP listener. Defaults to `9090`.
    pub prometheus_port: Option<u16>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true, prometheus_port: Some(9090) }
    }
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Root configuration for the alerting service and its tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployment environment (e.g., "development", "production"). Defaults to `"development"`.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub topics: Topics,

    #[serde(default)]
    pub processor: ProcessorConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            broker: BrokerConfig::default(),
            storage: StorageConfig::default(),
            topics: Topics::default(),
            processor: ProcessorConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Use `__` as a separator for nested fields (e.g., `ALERTING__PROCESSOR__WORKERS=8`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config_builder = Config::builder()
            .set_default("environment", "development")?
            .set_default("broker.backend", "memory")?
            .set_default("storage.backend", "memory")?
            .set_default("storage.key_prefix", defaults.storage.key_prefix)?
            .set_default("storage.ttl_seconds", 0)?
            .set_default("topics.intake", defaults.topics.intake)?
            .set_default("topics.store", defaults.topics.store)?
            .set_default("topics.event", defaults.topics.event)?
            .set_default("metrics.enabled", true)?
            .set_default("metrics.prometheus_port", 9090)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("ALERTING").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/config.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `ALERTING_CONFIG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(&config_path)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.processor.workers == 0 {
            return Err("Processor workers must be greater than 0".to_string());
        }

        if self.processor.queue_capacity == 0 {
            return Err("Processor queue capacity must be greater than 0".to_string());
        }

        let topics = self.topics.all();
        if topics.iter().any(|t| t.trim().is_empty()) {
            return Err("Topic names must not be empty".to_string());
        }
        if topics.iter().collect::<HashSet<_>>().len() != topics.len() {
            return Err(format!("Topic names must be distinct: {}", topics.join(", ")));
        }

        if self.broker.backend == Backend::Redis && is_blank(self.broker.redis_url.as_deref()) {
            return Err("Broker backend 'redis' requires broker.redis_url".to_string());
        }

        if self.storage.backend == Backend::Redis && is_blank(self.storage.redis_url.as_deref()) {
            return Err("Storage backend 'redis' requires storage.redis_url".to_string());
        }

        let retry = &self.processor.retry;
        if !(0.0..=1.0).contains(&retry.jitter_factor) {
            return Err(format!(
                "Retry jitter factor must be within 0..=1, got {}",
                retry.jitter_factor
            ));
        }
        if retry.max_delay_ms < retry.base_delay_ms {
            return Err("Retry max delay must not be less than the base delay".to_string());
        }

        if self.metrics.enabled && self.metrics.prometheus_port == Some(0) {
            return Err("Prometheus port must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }

    /// Snapshot expiry, `None` when disabled.
    #[must_use]
    pub fn storage_ttl(&self) -> Option<Duration> {
        (self.storage.ttl_seconds > 0).then(|| Duration::from_secs(self.storage.ttl_seconds))
    }

    #[must_use]
    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            ttl: self.storage_ttl(),
            mirror_to_store_topic: self.processor.mirror_to_store_topic,
            report_refire: self.processor.report_refire,
            failure_policy: self.processor.failure_policy,
            retry: RetryPolicy::from(&self.processor.retry),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
