//! Worker configuration

use crate::registry::StreamDef;
use std::time::Duration;
use uuid::Uuid;

/// Configuration for a [`StreamWorker`](crate::StreamWorker).
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub stream_name: String,
    pub consumer_group: String,
    /// Consumer name within the group, unique per process
    pub consumer_id: String,
    pub dlq_stream: String,
    pub max_length: i64,
    /// Sleep between reads when nothing is available
    pub poll_interval_ms: u64,
    /// Minimum idle time before a pending entry is reclaimed
    pub claim_idle_ms: u64,
    /// Processing attempts per entry; the next delivery goes to the DLQ
    pub max_deliveries: u64,
}

impl WorkerConfig {
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self {
            stream_name: S::STREAM_NAME.to_string(),
            consumer_group: S::CONSUMER_GROUP.to_string(),
            consumer_id: generate_consumer_id(),
            dlq_stream: S::DLQ_STREAM.to_string(),
            max_length: S::MAX_LENGTH,
            poll_interval_ms: S::POLL_INTERVAL_MS,
            claim_idle_ms: S::CLAIM_IDLE_MS,
            max_deliveries: S::MAX_DELIVERIES,
        }
    }

    pub fn new(stream_name: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        let stream_name = stream_name.into();
        Self {
            dlq_stream: format!("{stream_name}:dlq"),
            stream_name,
            consumer_group: consumer_group.into(),
            consumer_id: generate_consumer_id(),
            max_length: 100_000,
            poll_interval_ms: 500,
            claim_idle_ms: 30_000,
            max_deliveries: 5,
        }
    }

    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    pub fn with_poll_interval_ms(mut self, interval: u64) -> Self {
        self.poll_interval_ms = interval.max(1);
        self
    }

    pub fn with_claim_idle_ms(mut self, idle: u64) -> Self {
        self.claim_idle_ms = idle;
        self
    }

    /// At least one delivery is always attempted
    pub fn with_max_deliveries(mut self, max: u64) -> Self {
        self.max_deliveries = max.max(1);
        self
    }

    /// True once a message has already reached the processor `max_deliveries`
    /// times; that delivery is dead-lettered instead of processed.
    pub fn deliveries_exhausted(&self, deliveries: u64) -> bool {
        deliveries > self.max_deliveries
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// How often the worker scans the pending list
    pub fn claim_interval(&self) -> Duration {
        Duration::from_millis((self.claim_idle_ms / 2).max(self.poll_interval_ms))
    }
}

fn generate_consumer_id() -> String {
    format!("worker-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OrdersStream;

    impl StreamDef for OrdersStream {
        const STREAM_NAME: &'static str = "orders:events";
        const CONSUMER_GROUP: &'static str = "order_workers";
        const DLQ_STREAM: &'static str = "orders:events:dlq";
        const CLAIM_IDLE_MS: u64 = 10_000;
    }

    #[test]
    fn test_from_stream_def() {
        let config = WorkerConfig::from_stream_def::<OrdersStream>();

        assert_eq!(config.stream_name, "orders:events");
        assert_eq!(config.consumer_group, "order_workers");
        assert_eq!(config.dlq_stream, "orders:events:dlq");
        assert_eq!(config.claim_idle_ms, 10_000);
        assert_eq!(config.max_deliveries, 5);
        assert!(config.consumer_id.starts_with("worker-"));
    }

    #[test]
    fn test_consumer_ids_are_unique() {
        let a = WorkerConfig::new("s", "g");
        let b = WorkerConfig::new("s", "g");
        assert_ne!(a.consumer_id, b.consumer_id);
    }

    #[test]
    fn test_builder_pattern() {
        let config = WorkerConfig::new("my:stream", "my_group")
            .with_consumer_id("worker-1")
            .with_max_deliveries(0)
            .with_poll_interval_ms(50)
            .with_claim_idle_ms(1_000);

        assert_eq!(config.dlq_stream, "my:stream:dlq");
        assert_eq!(config.consumer_id, "worker-1");
        assert_eq!(config.max_deliveries, 1);
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.claim_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_max_deliveries_counts_processing_attempts() {
        let config = WorkerConfig::new("s", "g");
        assert!(!config.deliveries_exhausted(1));
        assert!(!config.deliveries_exhausted(5));
        assert!(config.deliveries_exhausted(6));

        let single = WorkerConfig::new("s", "g").with_max_deliveries(1);
        assert!(!single.deliveries_exhausted(1));
        assert!(single.deliveries_exhausted(2));
    }

    #[test]
    fn test_claim_interval_never_below_poll_interval() {
        let config = WorkerConfig::new("s", "g")
            .with_poll_interval_ms(2_000)
            .with_claim_idle_ms(1_000);
        assert_eq!(config.claim_interval(), Duration::from_millis(2_000));
    }
}
