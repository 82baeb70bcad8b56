//! Redis-backed drivers.
//!
//! Snapshots are plain string keys written with `SET .. EX`; topics are Redis
//! streams, appended with `XADD` and tailed with a blocking `XREAD`.

use std::time::Duration;

use async_trait::async_trait;
use ::redis::{
    cmd, from_redis_value,
    streams::{StreamRangeReply, StreamReadOptions, StreamReadReply},
    AsyncCommands, RedisResult,
};
use deadpool_redis::{Config, Pool, Runtime};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{Storage, StorageError, Stream, StreamError};

/// Field name carrying the payload inside each stream entry.
const PAYLOAD_FIELD: &str = "payload";

/// How long one `XREAD` blocks before the loop re-checks its sink.
const READ_BLOCK_MS: usize = 5_000;
const READ_BATCH: usize = 32;
const READ_RETRY_DELAY: Duration = Duration::from_secs(5);

fn create_pool(url: &str) -> Result<Pool, String> {
    Config::from_url(url).create_pool(Some(Runtime::Tokio1)).map_err(|e| e.to_string())
}

/// Snapshot store on Redis string keys.
#[derive(Clone)]
pub struct RedisStorage {
    pool: Pool,
    key_prefix: String,
}

impl RedisStorage {
    /// Creates a pooled client. No connection is opened until first use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the URL cannot be parsed.
    pub fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, StorageError> {
        let pool = create_pool(url).map_err(StorageError::Connection)?;
        Ok(Self { pool, key_prefix: key_prefix.into() })
    }

    fn key(&self, id: &str) -> String {
        if self.key_prefix.is_empty() {
            id.to_string()
        } else {
            format!("{}:{}", self.key_prefix, id)
        }
    }
}

#[async_trait]
impl Storage for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut conn =
            self.pool.get().await.map_err(|e| StorageError::Connection(e.to_string()))?;

        conn.get::<_, Option<Vec<u8>>>(self.key(key)).await.map_err(|e| {
            StorageError::Operation { key: key.to_string(), reason: e.to_string() }
        })
    }

    async fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        let mut conn =
            self.pool.get().await.map_err(|e| StorageError::Connection(e.to_string()))?;
        let full_key = self.key(key);

        let result: RedisResult<()> = match ttl.map(|t| t.as_secs()).filter(|s| *s > 0) {
            Some(seconds) => conn.set_ex(full_key, value, seconds).await,
            None => conn.set(full_key, value).await,
        };

        result.map_err(|e| StorageError::Operation { key: key.to_string(), reason: e.to_string() })
    }
}

/// Topic transport on Redis streams.
#[derive(Clone)]
pub struct RedisStream {
    pool: Pool,
}

impl RedisStream {
    /// # Errors
    ///
    /// Returns [`StreamError::Connection`] if the URL cannot be parsed.
    pub fn connect(url: &str) -> Result<Self, StreamError> {
        let pool = create_pool(url).map_err(StreamError::Connection)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Stream for RedisStream {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), StreamError> {
        let mut conn = self.pool.get().await.map_err(|e| StreamError::Publish {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;

        let _: String = cmd("XADD")
            .arg(topic)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| StreamError::Publish { topic: topic.to_string(), reason: e.to_string() })?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str, sink: mpsc::Sender<Vec<u8>>) -> Result<(), StreamError> {
        let subscribe_err =
            |reason: String| StreamError::Subscribe { topic: topic.to_string(), reason };

        let mut conn = self.pool.get().await.map_err(|e| subscribe_err(e.to_string()))?;

        // Tail from the newest existing entry so nothing published after this call is missed.
        let newest: StreamRangeReply = cmd("XREVRANGE")
            .arg(topic)
            .arg("+")
            .arg("-")
            .arg("COUNT")
            .arg(1)
            .query_async(&mut conn)
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;
        let mut last_id =
            newest.ids.first().map_or_else(|| "0-0".to_string(), |entry| entry.id.clone());

        let topic = topic.to_string();
        tokio::spawn(async move {
            info!(topic = %topic, from = %last_id, "redis stream listener started");
            let opts = StreamReadOptions::default().block(READ_BLOCK_MS).count(READ_BATCH);

            while !sink.is_closed() {
                let reply: RedisResult<StreamReadReply> =
                    conn.xread_options(&[&topic], &[&last_id], &opts).await;

                let reply = match reply {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!(topic = %topic, error = %e, "stream read failed, retrying");
                        tokio::time::sleep(READ_RETRY_DELAY).await;
                        continue;
                    }
                };

                for entry in reply.keys.into_iter().flat_map(|key| key.ids) {
                    last_id.clone_from(&entry.id);
                    let Some(value) = entry.map.get(PAYLOAD_FIELD) else {
                        warn!(topic = %topic, id = %entry.id, "stream entry without payload");
                        continue;
                    };
                    let payload = match from_redis_value::<Vec<u8>>(value) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!(topic = %topic, id = %entry.id, error = %e, "unreadable payload");
                            continue;
                        }
                    };
                    if sink.send(payload).await.is_err() {
                        break;
                    }
                }
            }
            debug!(topic = %topic, "redis stream listener stopped");
        });

        Ok(())
    }
}
