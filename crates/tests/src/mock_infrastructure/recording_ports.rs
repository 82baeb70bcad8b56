//! Recording storage and stream ports with fault injection.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU32, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use alerting_core::{
    events::LifecycleEvent,
    ports::{MemoryStorage, MemoryStream, Storage, StorageError, Stream, StreamError},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Decrements `counter` if it is positive. Returns whether a failure was consumed.
fn take_failure(counter: &AtomicU32) -> bool {
    counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

#[derive(Default)]
struct StorageState {
    writes: Mutex<Vec<String>>,
    gets: AtomicUsize,
    failing_sets: AtomicU32,
    failing_gets: AtomicU32,
}

/// [`MemoryStorage`] that logs successful writes and fails on demand.
///
/// Clones share the same data and the same counters.
#[derive(Clone, Default)]
pub struct RecordingStorage {
    inner: MemoryStorage,
    state: Arc<StorageState>,
}

impl RecordingStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` calls to `set` fail.
    pub fn fail_next_sets(&self, n: u32) {
        self.state.failing_sets.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` calls to `get` fail.
    pub fn fail_next_gets(&self, n: u32) {
        self.state.failing_gets.store(n, Ordering::SeqCst);
    }

    /// Writes `value` directly, bypassing the write log.
    pub async fn seed(&self, key: &str, value: &[u8]) {
        self.inner.set(key, value, None).await.expect("memory storage accepts writes");
    }

    /// Keys of the successful writes, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.state.writes.lock().clone()
    }

    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state.writes.lock().len()
    }

    #[must_use]
    pub fn get_count(&self) -> usize {
        self.state.gets.load(Ordering::SeqCst)
    }

    /// Current value under `key`.
    pub async fn snapshot(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).await.expect("memory storage reads succeed")
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.state.gets.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.state.failing_gets) {
            return Err(StorageError::Operation {
                key: key.to_string(),
                reason: "injected get failure".to_string(),
            });
        }
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        if take_failure(&self.state.failing_sets) {
            return Err(StorageError::Operation {
                key: key.to_string(),
                reason: "injected set failure".to_string(),
            });
        }
        self.inner.set(key, value, ttl).await?;
        self.state.writes.lock().push(key.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct StreamState {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    failing_publishes: AtomicU32,
    failing_topics: Mutex<HashSet<String>>,
}

/// [`MemoryStream`] that logs successful publishes and fails on demand.
///
/// Clones share the same subscribers and the same log.
#[derive(Clone, Default)]
pub struct RecordingStream {
    inner: MemoryStream,
    state: Arc<StreamState>,
}

impl RecordingStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` publishes fail, on any topic.
    pub fn fail_next_publishes(&self, n: u32) {
        self.state.failing_publishes.store(n, Ordering::SeqCst);
    }

    /// Makes every publish on `topic` fail until [`heal_topic`](Self::heal_topic).
    pub fn fail_topic(&self, topic: &str) {
        self.state.failing_topics.lock().insert(topic.to_string());
    }

    pub fn heal_topic(&self, topic: &str) {
        self.state.failing_topics.lock().remove(topic);
    }

    /// Payloads successfully published on `topic`, in order.
    #[must_use]
    pub fn published_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.state
            .published
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Lifecycle events published on `topic`, decoded.
    #[must_use]
    pub fn events_on(&self, topic: &str) -> Vec<LifecycleEvent> {
        self.published_on(topic)
            .iter()
            .map(|payload| LifecycleEvent::from_bytes(payload).expect("valid lifecycle event"))
            .collect()
    }

    /// Sends `payload` to the subscribers of `topic` without logging it.
    pub async fn inject(&self, topic: &str, payload: &[u8]) {
        self.inner.publish(topic, payload).await.expect("memory stream accepts publishes");
    }
}

#[async_trait]
impl Stream for RecordingStream {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), StreamError> {
        if self.state.failing_topics.lock().contains(topic)
            || take_failure(&self.state.failing_publishes)
        {
            return Err(StreamError::Publish {
                topic: topic.to_string(),
                reason: "injected publish failure".to_string(),
            });
        }
        self.inner.publish(topic, payload).await?;
        self.state.published.lock().push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    async fn subscribe(&self, topic: &str, sink: mpsc::Sender<Vec<u8>>) -> Result<(), StreamError> {
        self.inner.subscribe(topic, sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_injected_set_failures_are_consumed() {
        let storage = RecordingStorage::new();
        storage.fail_next_sets(1);

        assert!(storage.set("a1", b"x", None).await.is_err());
        assert!(storage.set("a1", b"x", None).await.is_ok());
        assert_eq!(storage.writes(), vec!["a1".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_topic_until_healed() {
        let stream = RecordingStream::new();
        stream.fail_topic("alert.event");

        assert!(stream.publish("alert.event", b"e").await.is_err());
        assert!(stream.publish("alert.store", b"s").await.is_ok());

        stream.heal_topic("alert.event");
        assert!(stream.publish("alert.event", b"e").await.is_ok());
        assert_eq!(stream.published_on("alert.event").len(), 1);
    }
}
