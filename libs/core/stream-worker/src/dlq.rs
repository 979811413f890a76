//! Dead letter stream for entries that exhausted their deliveries.

use crate::error::StreamError;
use crate::message::StreamMessage;
use crate::registry::PAYLOAD_FIELD;
use chrono::Utc;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use tracing::warn;

type StreamEntries = Vec<(String, Vec<(String, String)>)>;

#[derive(Clone)]
pub struct DlqManager {
    redis: ConnectionManager,
    dlq_stream: String,
    max_length: i64,
}

impl DlqManager {
    pub fn new(redis: ConnectionManager, dlq_stream: impl Into<String>) -> Self {
        Self {
            redis,
            dlq_stream: dlq_stream.into(),
            max_length: 10_000,
        }
    }

    pub fn dlq_stream(&self) -> &str {
        &self.dlq_stream
    }

    /// Copy the raw entry to the DLQ stream. The caller acknowledges the original.
    pub async fn move_to_dlq(
        &self,
        message: &StreamMessage,
        reason: &str,
    ) -> Result<String, StreamError> {
        let mut conn = self.redis.clone();

        let dlq_id: String = redis::cmd("XADD")
            .arg(&self.dlq_stream)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_length)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(message.field(PAYLOAD_FIELD).unwrap_or_default())
            .arg("original_id")
            .arg(&message.id)
            .arg("reason")
            .arg(reason)
            .arg("deliveries")
            .arg(message.deliveries)
            .arg("failed_at")
            .arg(Utc::now().to_rfc3339())
            .query_async(&mut conn)
            .await?;

        warn!(
            stream_id = %message.id,
            dlq_id = %dlq_id,
            deliveries = message.deliveries,
            reason,
            "Moved message to DLQ"
        );

        Ok(dlq_id)
    }

    /// Oldest entries first
    pub async fn list(&self, count: usize) -> Result<Vec<DlqEntry>, StreamError> {
        let mut conn = self.redis.clone();

        let entries: StreamEntries = redis::cmd("XRANGE")
            .arg(&self.dlq_stream)
            .arg("-")
            .arg("+")
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        Ok(entries.into_iter().map(DlqEntry::from_fields).collect())
    }

    pub async fn length(&self) -> Result<i64, StreamError> {
        let mut conn = self.redis.clone();
        let len: i64 = conn.xlen(&self.dlq_stream).await?;
        Ok(len)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DlqEntry {
    pub id: String,
    pub original_id: String,
    pub payload: String,
    pub reason: String,
    pub deliveries: u64,
    pub failed_at: String,
}

impl DlqEntry {
    fn from_fields((id, fields): (String, Vec<(String, String)>)) -> Self {
        let get = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        Self {
            original_id: get("original_id"),
            payload: get(PAYLOAD_FIELD),
            reason: get("reason"),
            deliveries: get("deliveries").parse().unwrap_or(0),
            failed_at: get("failed_at"),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dlq_entry_from_fields() {
        let entry = DlqEntry::from_fields((
            "5-0".to_string(),
            vec![
                (PAYLOAD_FIELD.to_string(), "not json".to_string()),
                ("original_id".to_string(), "1-0".to_string()),
                ("reason".to_string(), "max deliveries exceeded".to_string()),
                ("deliveries".to_string(), "6".to_string()),
            ],
        ));

        assert_eq!(entry.id, "5-0");
        assert_eq!(entry.original_id, "1-0");
        assert_eq!(entry.payload, "not json");
        assert_eq!(entry.deliveries, 6);
        assert_eq!(entry.failed_at, "");
    }
}
