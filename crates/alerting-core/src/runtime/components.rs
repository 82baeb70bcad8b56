//! Port construction and the component container shared by the runtime.

use std::sync::Arc;

use crate::{
    config::{AppConfig, Backend, BrokerConfig, StorageConfig},
    ports::{MemoryStorage, MemoryStream, Storage, StorageError, Stream, StreamError},
    processor::Processor,
};

/// Creates the storage driver selected by `config`.
///
/// # Errors
///
/// Returns [`StorageError`] if the Redis URL is missing or invalid, or if the
/// crate was built without the `redis` feature.
pub fn connect_storage(config: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    match config.backend {
        Backend::Memory => Ok(Arc::new(MemoryStorage::new())),
        #[cfg(feature = "redis")]
        Backend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                StorageError::Connection("storage.redis_url is not set".to_string())
            })?;
            Ok(Arc::new(crate::ports::RedisStorage::connect(url, config.key_prefix.clone())?))
        }
        #[cfg(not(feature = "redis"))]
        Backend::Redis => Err(StorageError::Unavailable(Backend::Redis.as_str().to_string())),
    }
}

/// Creates the stream driver selected by `config`.
///
/// # Errors
///
/// Returns [`StreamError`] if the Redis URL is missing or invalid, or if the
/// crate was built without the `redis` feature.
pub fn connect_stream(config: &BrokerConfig) -> Result<Arc<dyn Stream>, StreamError> {
    match config.backend {
        Backend::Memory => Ok(Arc::new(MemoryStream::new())),
        #[cfg(feature = "redis")]
        Backend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                StreamError::Connection("broker.redis_url is not set".to_string())
            })?;
            Ok(Arc::new(crate::ports::RedisStream::connect(url)?))
        }
        #[cfg(not(feature = "redis"))]
        Backend::Redis => Err(StreamError::Unavailable(Backend::Redis.as_str().to_string())),
    }
}

/// Ports plus the processor template every worker clones.
#[derive(Clone)]
pub struct AlertingComponents {
    storage: Arc<dyn Storage>,
    stream: Arc<dyn Stream>,
    processor: Processor,
}

impl AlertingComponents {
    #[must_use]
    pub fn new(config: &AppConfig, storage: Arc<dyn Storage>, stream: Arc<dyn Stream>) -> Self {
        let processor = Processor::new(
            storage.clone(),
            stream.clone(),
            config.topics.clone(),
            config.processor_options(),
        );
        Self { storage, stream, processor }
    }

    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    #[must_use]
    pub fn stream(&self) -> &Arc<dyn Stream> {
        &self.stream
    }

    #[must_use]
    pub fn processor(&self) -> &Processor {
        &self.processor
    }
}
