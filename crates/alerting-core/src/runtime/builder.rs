//! Builder for the alerting runtime.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{
    components::{connect_storage, connect_stream, AlertingComponents},
    lifecycle::AlertingRuntime,
};
use crate::{
    config::AppConfig,
    ports::{Storage, StorageError, Stream, StreamError},
};

/// Errors that can occur while building or starting the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    #[error("Storage initialization failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Stream initialization failed: {0}")]
    Stream(#[from] StreamError),

    #[error("Runtime already started")]
    AlreadyStarted,
}

#[derive(Clone)]
struct RuntimeOptions {
    shutdown_channel_capacity: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self { shutdown_channel_capacity: 16 }
    }
}

/// Builder for an [`AlertingRuntime`].
///
/// Ports that are not injected are created from the configuration.
///
/// # Examples
///
/// ```no_run
/// # use alerting_core::{config::AppConfig, runtime::AlertingRuntimeBuilder};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::load()?;
///
/// let mut runtime = AlertingRuntimeBuilder::new().with_config(config).build()?;
/// runtime.start().await?;
/// let report = runtime.wait_for_shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct AlertingRuntimeBuilder {
    config: Option<AppConfig>,
    storage: Option<Arc<dyn Storage>>,
    stream: Option<Arc<dyn Stream>>,
    options: RuntimeOptions,
}

impl AlertingRuntimeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { config: None, storage: None, stream: None, options: RuntimeOptions::default() }
    }

    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses `storage` instead of the configured storage backend.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Uses `stream` instead of the configured broker backend.
    #[must_use]
    pub fn with_stream(mut self, stream: Arc<dyn Stream>) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Sets custom shutdown channel capacity (default: 16).
    #[must_use]
    pub fn with_shutdown_channel_capacity(mut self, capacity: usize) -> Self {
        self.options.shutdown_channel_capacity = capacity.max(1);
        self
    }

    /// Validates the configuration and creates the ports. Nothing runs until
    /// [`AlertingRuntime::start`].
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if configuration is missing or invalid, or a port
    /// cannot be created.
    pub fn build(self) -> Result<AlertingRuntime, RuntimeError> {
        let config = self.config.ok_or_else(|| {
            RuntimeError::ConfigValidation("No configuration provided".to_string())
        })?;

        config.validate().map_err(RuntimeError::ConfigValidation)?;

        info!(
            environment = %config.environment,
            broker = config.broker.backend.as_str(),
            storage = config.storage.backend.as_str(),
            workers = config.processor.workers,
            "Initializing alerting runtime"
        );

        let storage = match self.storage {
            Some(storage) => storage,
            None => connect_storage(&config.storage)?,
        };
        debug!("Storage initialized");

        let stream = match self.stream {
            Some(stream) => stream,
            None => connect_stream(&config.broker)?,
        };
        debug!("Stream initialized");

        let (shutdown_tx, _) = broadcast::channel::<()>(self.options.shutdown_channel_capacity);
        let components = AlertingComponents::new(&config, storage, stream);

        Ok(AlertingRuntime::new(components, shutdown_tx, config))
    }
}

impl Default for AlertingRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
