//! Notification publisher.
//!
//! [`StreamNotifier`] appends the event envelope to the user events stream.
//! [`LoggingNotifier`] is the fallback when no queue is configured.

use async_trait::async_trait;
use metrics::counter;
use redis::aio::ConnectionManager;
use serde_json::Value;
use std::sync::Arc;
use stream_worker::{StreamDef, StreamError, StreamProducer};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::events::{Event, EventType};
use crate::streams::UserEventStream;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("failed to publish event: {0}")]
    Publish(#[from] StreamError),
}

/// Publishes user change events.
///
/// Callers treat delivery as best effort: an error is logged by the caller,
/// never surfaced to the user whose mutation triggered it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event_type: EventType, payload: Value)
    -> Result<(), NotificationError>;
}

/// Appends events to a Redis stream (`XADD ... MAXLEN ~`).
#[derive(Clone)]
pub struct StreamNotifier {
    producer: StreamProducer,
}

impl StreamNotifier {
    /// Publishes to [`UserEventStream`]
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            producer: StreamProducer::from_stream_def::<UserEventStream>(redis),
        }
    }

    pub fn with_stream_name(mut self, stream_name: impl Into<String>) -> Self {
        self.producer = self.producer.with_stream_name(stream_name);
        self
    }

    pub fn stream_name(&self) -> &str {
        self.producer.stream_name()
    }
}

#[async_trait]
impl Notifier for StreamNotifier {
    #[instrument(skip(self, payload), fields(stream = %self.producer.stream_name()))]
    async fn publish(
        &self,
        event_type: EventType,
        payload: Value,
    ) -> Result<(), NotificationError> {
        let event = Event::new(event_type, payload);
        let stream_id = self.producer.send(&event).await?;

        counter!(
            "user_events_published_total",
            "event_type" => event_type.as_str()
        )
        .increment(1);
        debug!(%event_type, %stream_id, "Published user event");
        Ok(())
    }
}

/// Logs instead of publishing
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn publish(
        &self,
        event_type: EventType,
        payload: Value,
    ) -> Result<(), NotificationError> {
        info!(
            %event_type,
            stream = UserEventStream::STREAM_NAME,
            payload = %payload,
            "Notification queue not configured, event not published"
        );
        Ok(())
    }
}

/// Keeps every published event in memory, in publish order.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(
        &self,
        event_type: EventType,
        payload: Value,
    ) -> Result<(), NotificationError> {
        self.events.lock().await.push(Event::new(event_type, payload));
        Ok(())
    }
}
