//! Prometheus metrics for stream workers

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global Prometheus recorder. Subsequent calls return the same handle.
///
/// Returns `None` if another recorder was installed first.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE
        .get_or_try_init(|| {
            let handle = PrometheusBuilder::new().install_recorder()?;
            info!("Prometheus metrics initialized");
            Ok::<_, metrics_exporter_prometheus::BuildError>(handle)
        })
        .map_err(|e| warn!(error = %e, "Failed to install Prometheus recorder"))
        .ok()
}

/// Render metrics in Prometheus text format (empty before `init_metrics`)
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_default()
}

/// Per-worker metric recorder labelled by stream and processor
#[derive(Clone)]
pub struct StreamMetrics {
    stream_name: String,
    processor_name: String,
}

impl StreamMetrics {
    pub fn new(stream_name: impl Into<String>, processor_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            processor_name: processor_name.into(),
        }
    }

    pub fn message_received(&self) {
        counter!(
            "stream_worker_messages_received_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    pub fn message_acked(&self, duration: Duration) {
        self.outcome("acked");
        histogram!(
            "stream_worker_message_duration_seconds",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// Left pending for redelivery
    pub fn message_retained(&self) {
        self.outcome("retained");
    }

    pub fn message_dead_lettered(&self) {
        self.outcome("dead_lettered");
    }

    pub fn messages_claimed(&self, count: usize) {
        counter!(
            "stream_worker_messages_claimed_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(count as u64);
    }

    pub fn pending_count(&self, count: i64) {
        gauge!(
            "stream_worker_pending_count",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .set(count as f64);
    }

    fn outcome(&self, outcome: &'static str) {
        counter!(
            "stream_worker_messages_processed_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone(),
            "outcome" => outcome
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let metrics = StreamMetrics::new("test:stream", "test_processor");
        metrics.message_received();
        metrics.message_acked(Duration::from_millis(3));
        metrics.messages_claimed(2);
        assert_eq!(metrics.stream_name, "test:stream");
    }

    #[test]
    fn test_init_metrics_is_idempotent() {
        let first = init_metrics().map(|h| h as *const _);
        let second = init_metrics().map(|h| h as *const _);
        assert_eq!(first, second);
        StreamMetrics::new("render:stream", "p").message_received();
        assert!(render_metrics().contains("stream_worker_messages_received_total"));
    }
}
