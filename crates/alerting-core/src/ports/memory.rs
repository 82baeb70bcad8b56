//! In-process drivers.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{Storage, StorageError, Stream, StreamError};

#[derive(Debug, Clone)]
struct StoredEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// `DashMap`-backed storage. Expired entries are evicted on read.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<DashMap<String, StoredEntry>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }

        // Read guard is released; evict unless a fresh value raced in.
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        trace!(key, "evicted expired entry");
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.insert(key.to_string(), StoredEntry { value: value.to_vec(), expires_at });
        Ok(())
    }
}

/// Per-topic fan-out to every live subscriber.
///
/// Publishing to a topic with no subscribers succeeds and drops the payload.
#[derive(Debug, Clone, Default)]
pub struct MemoryStream {
    subscribers: Arc<DashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>,
}

impl MemoryStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers.get(topic).map_or(0, |subs| subs.iter().filter(|s| !s.is_closed()).count())
    }
}

#[async_trait]
impl Stream for MemoryStream {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), StreamError> {
        // Snapshot the senders so no map guard is held across an await.
        let senders: Vec<_> = match self.subscribers.get(topic) {
            Some(subs) => subs.clone(),
            None => return Ok(()),
        };

        let mut closed = 0usize;
        for sender in &senders {
            if sender.send(payload.to_vec()).await.is_err() {
                closed += 1;
            }
        }

        if closed > 0 {
            if let Some(mut subs) = self.subscribers.get_mut(topic) {
                subs.retain(|s| !s.is_closed());
            }
            debug!(topic, closed, "pruned closed subscribers");
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str, sink: mpsc::Sender<Vec<u8>>) -> Result<(), StreamError> {
        self.subscribers.entry(topic.to_string()).or_default().push(sink);
        Ok(())
    }
}
