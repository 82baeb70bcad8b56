//! Storage and stream ports.
//!
//! The processor only ever sees these two traits. Drivers live in submodules:
//! [`memory`] for tests and single-process deployments, and `redis` (behind the
//! `redis` feature) for shared deployments.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use memory::{MemoryStorage, MemoryStream};
#[cfg(feature = "redis")]
pub use self::redis::{RedisStorage, RedisStream};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage connection failed: {0}")]
    Connection(String),

    #[error("Storage operation on '{key}' failed: {reason}")]
    Operation { key: String, reason: String },

    #[error("Storage backend '{0}' is not available in this build")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Stream connection failed: {0}")]
    Connection(String),

    #[error("Publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("Subscribe to '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("Stream backend '{0}' is not available in this build")]
    Unavailable(String),
}

/// Opaque byte store keyed by alert identity.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Stores `value`. The TTL is advisory.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>)
        -> Result<(), StorageError>;
}

/// Publish/subscribe transport for byte payloads on named topics.
#[async_trait]
pub trait Stream: Send + Sync {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), StreamError>;

    /// Forwards every payload received on `topic` into `sink` until the sink is closed.
    ///
    /// Returns once the subscription is established; delivery happens in the background.
    async fn subscribe(&self, topic: &str, sink: mpsc::Sender<Vec<u8>>) -> Result<(), StreamError>;
}

/// The three channels the alerting subsystem talks on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topics {
    /// Raw inbound alerts.
    pub intake: String,
    /// Canonical persist log.
    pub store: String,
    /// Lifecycle log/event stream.
    pub event: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            intake: "test.alert".to_string(),
            store: "alert.store".to_string(),
            event: "alert.event".to_string(),
        }
    }
}

impl Topics {
    /// Topic names in declaration order.
    #[must_use]
    pub fn all(&self) -> [&str; 3] {
        [&self.intake, &self.store, &self.event]
    }
}
