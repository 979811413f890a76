//! Notification subscriber.
//!
//! Per message: received, parsed, dispatched, acknowledged. An empty body is
//! acknowledged without dispatch. A body that does not parse is left pending so
//! the worker can redeliver it and eventually dead-letter it. Unknown event
//! types and handler failures are logged and acknowledged.

use async_trait::async_trait;
use metrics::counter;
use redis::aio::ConnectionManager;
use serde_json::Value;
use std::sync::Arc;
use stream_worker::{
    Disposition, StreamConsumer, StreamError, StreamMessage, StreamProcessor, StreamWorker,
    WorkerConfig,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::events::{EventType, IncomingEvent};
use crate::models::UserResponse;
use crate::streams::UserEventStream;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
pub type HandlerResult = Result<(), HandlerError>;

/// Downstream reaction to user changes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_user_created(&self, user: &UserResponse) -> HandlerResult;

    async fn handle_user_updated(&self, user: &UserResponse) -> HandlerResult;

    async fn handle_user_deleted(&self, id: &str) -> HandlerResult;
}

/// Logs every event it receives
#[derive(Debug, Clone, Default)]
pub struct LoggingEventHandler;

#[async_trait]
impl EventHandler for LoggingEventHandler {
    async fn handle_user_created(&self, user: &UserResponse) -> HandlerResult {
        info!(user_id = %user.id, nickname = %user.nickname, "User created");
        Ok(())
    }

    async fn handle_user_updated(&self, user: &UserResponse) -> HandlerResult {
        info!(user_id = %user.id, nickname = %user.nickname, "User updated");
        Ok(())
    }

    async fn handle_user_deleted(&self, id: &str) -> HandlerResult {
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

/// Applies the subscriber policy to one stream message
pub struct UserEventProcessor<H: EventHandler> {
    handler: Arc<H>,
}

impl<H: EventHandler> UserEventProcessor<H> {
    pub fn new(handler: H) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    pub fn from_arc(handler: Arc<H>) -> Self {
        Self { handler }
    }

    async fn dispatch(&self, event_type: EventType, payload: Value) -> HandlerResult {
        match event_type {
            EventType::UserCreated => {
                let user: UserResponse = serde_json::from_value(payload)?;
                self.handler.handle_user_created(&user).await
            }
            EventType::UserUpdated => {
                let user: UserResponse = serde_json::from_value(payload)?;
                self.handler.handle_user_updated(&user).await
            }
            EventType::UserDeleted => {
                let id = payload
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or("deleted event payload has no string id")?;
                self.handler.handle_user_deleted(id).await
            }
        }
    }
}

#[async_trait]
impl<H: EventHandler> StreamProcessor for UserEventProcessor<H> {
    async fn process(&self, message: &StreamMessage) -> Disposition {
        let Some(body) = message.payload() else {
            debug!(stream_id = %message.id, "Empty event body, acknowledging");
            return Disposition::Ack;
        };

        let incoming: IncomingEvent = match serde_json::from_str(body) {
            Ok(event) => event,
            Err(e) => {
                counter!("user_events_parse_failures_total").increment(1);
                error!(
                    stream_id = %message.id,
                    deliveries = message.deliveries,
                    error = %e,
                    "Failed to parse event, leaving it unacknowledged"
                );
                return Disposition::Retain;
            }
        };

        let Ok(event_type) = incoming.event_type.parse::<EventType>() else {
            warn!(
                stream_id = %message.id,
                event_type = %incoming.event_type,
                "Unknown event type, acknowledging"
            );
            return Disposition::Ack;
        };

        if let Err(e) = self.dispatch(event_type, incoming.payload).await {
            counter!(
                "user_events_handler_failures_total",
                "event_type" => event_type.as_str()
            )
            .increment(1);
            error!(
                stream_id = %message.id,
                %event_type,
                error = %e,
                "Event handler failed, acknowledging anyway"
            );
        }

        Disposition::Ack
    }

    fn name(&self) -> &'static str {
        "user_event_processor"
    }
}

/// Owns the enable switch and spawns the consumer loop.
pub struct NotificationSubscriber<H: EventHandler + 'static> {
    redis: ConnectionManager,
    config: WorkerConfig,
    enabled: bool,
    handler: Arc<H>,
}

impl<H: EventHandler + 'static> NotificationSubscriber<H> {
    /// Enabled subscriber on [`UserEventStream`]
    pub fn new(redis: ConnectionManager, handler: H) -> Self {
        Self {
            redis,
            config: WorkerConfig::from_stream_def::<UserEventStream>(),
            enabled: true,
            handler: Arc::new(handler),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Declare the consumer group, then spawn the loop if enabled.
    ///
    /// When disabled the group still exists, so events accumulate in the
    /// stream for later inspection, and `None` is returned.
    pub async fn start(
        self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Option<JoinHandle<Result<(), StreamError>>>, StreamError> {
        StreamConsumer::new(self.redis.clone(), self.config.clone())
            .ensure_consumer_group()
            .await?;

        if !self.enabled {
            info!(
                stream = %self.config.stream_name,
                group = %self.config.consumer_group,
                "Notification consumer disabled, not consuming"
            );
            return Ok(None);
        }

        let processor = Arc::new(UserEventProcessor::from_arc(self.handler));
        let worker = StreamWorker::with_arc_processor(self.redis, processor, self.config);

        Ok(Some(tokio::spawn(async move { worker.run(shutdown).await })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use stream_worker::PAYLOAD_FIELD;
    use uuid::Uuid;

    fn message(body: &str) -> StreamMessage {
        StreamMessage::new("1-0", vec![(PAYLOAD_FIELD.to_string(), body.to_string())], 1)
    }

    fn user() -> UserResponse {
        UserResponse {
            id: Uuid::new_v4(),
            first_name: "Alice".into(),
            last_name: "Bob".into(),
            nickname: "AB123".into(),
            email: "alice@bob.com".into(),
            country: "UK".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn envelope(event_type: &str, payload: Value) -> String {
        json!({ "type": event_type, "timestamp": Utc::now(), "payload": payload }).to_string()
    }

    #[tokio::test]
    async fn test_created_dispatches_with_matching_id() {
        let user = user();
        let id = user.id;

        let mut handler = MockEventHandler::new();
        handler
            .expect_handle_user_created()
            .withf(move |u| u.id == id)
            .times(1)
            .returning(|_| Ok(()));

        let processor = UserEventProcessor::new(handler);
        let body = envelope("user.created", serde_json::to_value(&user).unwrap());

        assert_eq!(processor.process(&message(&body)).await, Disposition::Ack);
    }

    #[tokio::test]
    async fn test_deleted_dispatches_id() {
        let id = Uuid::new_v4();

        let mut handler = MockEventHandler::new();
        handler
            .expect_handle_user_deleted()
            .withf(move |got| got == id.to_string())
            .times(1)
            .returning(|_| Ok(()));

        let processor = UserEventProcessor::new(handler);
        let body = envelope("user.deleted", json!({ "id": id }));

        assert_eq!(processor.process(&message(&body)).await, Disposition::Ack);
    }

    #[tokio::test]
    async fn test_empty_body_acked_without_dispatch() {
        // No expectations: any handler call panics
        let processor = UserEventProcessor::new(MockEventHandler::new());

        assert_eq!(processor.process(&message("")).await, Disposition::Ack);

        let no_field = StreamMessage::new("2-0", vec![], 1);
        assert_eq!(processor.process(&no_field).await, Disposition::Ack);
    }

    #[tokio::test]
    async fn test_parse_failure_is_retained() {
        let processor = UserEventProcessor::new(MockEventHandler::new());

        assert_eq!(processor.process(&message("{not json")).await, Disposition::Retain);
        assert_eq!(
            processor.process(&message(r#"{"payload":{}}"#)).await,
            Disposition::Retain
        );
    }

    #[tokio::test]
    async fn test_unknown_type_acked() {
        let processor = UserEventProcessor::new(MockEventHandler::new());
        let body = envelope("user.renamed", json!({}));

        assert_eq!(processor.process(&message(&body)).await, Disposition::Ack);
    }

    #[tokio::test]
    async fn test_handler_error_still_acked() {
        let mut handler = MockEventHandler::new();
        handler
            .expect_handle_user_updated()
            .times(1)
            .returning(|_| Err("smtp unavailable".into()));

        let processor = UserEventProcessor::new(handler);
        let body = envelope("user.updated", serde_json::to_value(user()).unwrap());

        assert_eq!(processor.process(&message(&body)).await, Disposition::Ack);
    }

    #[tokio::test]
    async fn test_undecodable_payload_acked_without_dispatch() {
        let processor = UserEventProcessor::new(MockEventHandler::new());

        let created = envelope("user.created", json!({ "id": "not-a-user" }));
        assert_eq!(processor.process(&message(&created)).await, Disposition::Ack);

        let deleted = envelope("user.deleted", json!({ "id": 42 }));
        assert_eq!(processor.process(&message(&deleted)).await, Disposition::Ack);
    }
}
