//! Consumer-group reads, acknowledgements and reclaiming of stale entries.

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::message::StreamMessage;
use redis::RedisResult;
use redis::aio::ConnectionManager;
use tracing::{debug, info, warn};

type StreamEntries = Vec<(String, Vec<(String, String)>)>;
type StreamReadReply = Vec<(String, StreamEntries)>;

/// Upper bound on pending entries inspected per reclaim pass
const PENDING_SCAN_LIMIT: usize = 100;

/// A stale entry reported by `XPENDING`: (id, consumer, idle ms, deliveries so far)
type PendingEntry = (String, String, i64, i64);

pub struct StreamConsumer {
    redis: ConnectionManager,
    config: WorkerConfig,
}

impl StreamConsumer {
    pub fn new(redis: ConnectionManager, config: WorkerConfig) -> Self {
        Self { redis, config }
    }

    pub fn stream_name(&self) -> &str {
        &self.config.stream_name
    }

    pub fn consumer_group(&self) -> &str {
        &self.config.consumer_group
    }

    pub fn consumer_id(&self) -> &str {
        &self.config.consumer_id
    }

    /// Create the stream and consumer group if missing. Idempotent.
    pub async fn ensure_consumer_group(&self) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Created consumer group"
                );
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group already exists"
                );
                Ok(())
            }
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Read up to `count` entries never delivered to this group. Does not block.
    pub async fn read_new(&self, count: usize) -> Result<Vec<StreamMessage>, StreamError> {
        let mut conn = self.redis.clone();

        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg("COUNT")
            .arg(count)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        Ok(reply
            .unwrap_or_default()
            .into_iter()
            .flat_map(|(_, entries)| entries)
            .map(|(id, fields)| StreamMessage::new(id, fields, 1))
            .collect())
    }

    pub async fn ack(&self, stream_id: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let _: i64 = redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(stream_id)
            .query_async(&mut conn)
            .await?;

        debug!(stream_id = %stream_id, "Acknowledged message");
        Ok(())
    }

    /// Take over pending entries idle for at least `claim_idle_ms`.
    ///
    /// Covers both crashed consumers and entries this consumer left
    /// unacknowledged. Each returned message carries its delivery count
    /// including the redelivery performed by the claim.
    pub async fn claim_stale(&self) -> Result<Vec<StreamMessage>, StreamError> {
        let mut conn = self.redis.clone();

        let pending: Vec<PendingEntry> = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(PENDING_SCAN_LIMIT)
            .query_async(&mut conn)
            .await?;

        let stale: Vec<(String, u64)> = pending
            .into_iter()
            .filter(|(_, _, idle, _)| *idle >= self.config.claim_idle_ms as i64)
            .map(|(id, _, _, deliveries)| (id, deliveries.max(0) as u64))
            .collect();

        if stale.is_empty() {
            return Ok(vec![]);
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg(self.config.claim_idle_ms);
        for (id, _) in &stale {
            cmd.arg(id);
        }

        let claimed: StreamEntries = cmd.query_async(&mut conn).await?;

        let messages: Vec<StreamMessage> = claimed
            .into_iter()
            .map(|(id, fields)| {
                let previous = stale
                    .iter()
                    .find(|(pending_id, _)| *pending_id == id)
                    .map(|(_, d)| *d)
                    .unwrap_or(0);
                StreamMessage::new(id, fields, previous + 1)
            })
            .collect();

        if !messages.is_empty() {
            warn!(
                stream = %self.config.stream_name,
                count = messages.len(),
                "Claimed stale messages"
            );
        }

        Ok(messages)
    }

    /// Entries delivered to the group but not yet acknowledged
    pub async fn pending_count(&self) -> Result<i64, StreamError> {
        let mut conn = self.redis.clone();

        let (count, _, _, _): (i64, Option<String>, Option<String>, Option<Vec<(String, String)>>) =
            redis::cmd("XPENDING")
                .arg(&self.config.stream_name)
                .arg(&self.config.consumer_group)
                .query_async(&mut conn)
                .await?;

        Ok(count)
    }
}
