//! Stream definitions.
//!
//! Each domain declares its stream as a unit struct implementing [`StreamDef`],
//! so producers and workers agree on names and limits at compile time.

/// Field under which the serialized payload is stored in every stream entry.
pub const PAYLOAD_FIELD: &str = "event";

/// Stream definition trait.
///
/// ```rust,ignore
/// pub struct UserEventStream;
///
/// impl StreamDef for UserEventStream {
///     const STREAM_NAME: &'static str = "users:events";
///     const CONSUMER_GROUP: &'static str = "user_notification_workers";
///     const DLQ_STREAM: &'static str = "users:events:dlq";
/// }
/// ```
pub trait StreamDef: Send + Sync {
    /// Redis stream key
    const STREAM_NAME: &'static str;

    const CONSUMER_GROUP: &'static str;

    /// Stream receiving entries that exhausted their deliveries
    const DLQ_STREAM: &'static str;

    /// Approximate MAXLEN applied on every XADD
    const MAX_LENGTH: i64 = 100_000;

    /// Sleep between reads when the stream is empty
    const POLL_INTERVAL_MS: u64 = 500;

    /// Pending entries idle longer than this are reclaimed and redelivered
    const CLAIM_IDLE_MS: u64 = 30_000;

    /// Processing attempts per entry before it is dead-lettered
    const MAX_DELIVERIES: u64 = 5;

    fn stream_name() -> &'static str {
        Self::STREAM_NAME
    }

    fn consumer_group() -> &'static str {
        Self::CONSUMER_GROUP
    }

    fn dlq_stream() -> &'static str {
        Self::DLQ_STREAM
    }
}
