use stream_worker::StreamDef;

/// Point-to-point queue carrying user change events
pub struct UserEventStream;

impl StreamDef for UserEventStream {
    const STREAM_NAME: &'static str = "users:events";
    const CONSUMER_GROUP: &'static str = "user_notification_workers";
    const DLQ_STREAM: &'static str = "users:events:dlq";
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_worker::WorkerConfig;

    #[test]
    fn test_user_event_stream_names() {
        assert_eq!(UserEventStream::stream_name(), "users:events");
        assert_eq!(UserEventStream::consumer_group(), "user_notification_workers");
        assert_eq!(UserEventStream::dlq_stream(), "users:events:dlq");
    }

    #[test]
    fn test_worker_config_defaults() {
        let config = WorkerConfig::from_stream_def::<UserEventStream>();
        assert_eq!(config.max_deliveries, 5);
        assert_eq!(config.claim_idle_ms, 30_000);
        assert_eq!(config.poll_interval_ms, 500);
    }
}
