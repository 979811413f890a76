//! Stream producer
//!
//! ```rust,ignore
//! let producer = StreamProducer::from_stream_def::<UserEventStream>(redis);
//! let id = producer.send(&event).await?;
//! ```

use crate::error::StreamError;
use crate::registry::{PAYLOAD_FIELD, StreamDef};
use metrics::counter;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use tracing::debug;

/// Appends entries to a single stream. Cheap to clone.
#[derive(Clone)]
pub struct StreamProducer {
    redis: ConnectionManager,
    stream_name: String,
    max_length: i64,
}

impl StreamProducer {
    pub fn new(redis: ConnectionManager, stream_name: impl Into<String>) -> Self {
        Self {
            redis,
            stream_name: stream_name.into(),
            max_length: 100_000,
        }
    }

    pub fn from_stream_def<S: StreamDef>(redis: ConnectionManager) -> Self {
        Self {
            redis,
            stream_name: S::STREAM_NAME.to_string(),
            max_length: S::MAX_LENGTH,
        }
    }

    pub fn with_stream_name(mut self, stream_name: impl Into<String>) -> Self {
        self.stream_name = stream_name.into();
        self
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Serialize `payload` as JSON and append it. Returns the entry ID.
    pub async fn send<T: Serialize>(&self, payload: &T) -> Result<String, StreamError> {
        let json = serde_json::to_string(payload)?;
        self.send_raw(&json).await
    }

    /// Append an already-serialized payload.
    ///
    /// Entries are persisted by Redis (AOF/RDB) and trimmed with `MAXLEN ~`.
    pub async fn send_raw(&self, payload: &str) -> Result<String, StreamError> {
        let mut conn = self.redis.clone();

        let result: Result<String, redis::RedisError> = redis::cmd("XADD")
            .arg(&self.stream_name)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_length)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await;

        let status = if result.is_ok() { "success" } else { "failed" };
        counter!(
            "stream_producer_messages_total",
            "stream" => self.stream_name.clone(),
            "status" => status
        )
        .increment(1);

        let stream_id = result?;
        debug!(stream = %self.stream_name, stream_id = %stream_id, "Appended message");
        Ok(stream_id)
    }

    pub async fn stream_length(&self) -> Result<i64, StreamError> {
        let mut conn = self.redis.clone();
        let len: i64 = conn.xlen(&self.stream_name).await?;
        Ok(len)
    }
}
