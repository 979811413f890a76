//! Processor trait and the generic [`StreamWorker`] loop.

use crate::config::WorkerConfig;
use crate::consumer::StreamConsumer;
use crate::dlq::DlqManager;
use crate::error::StreamError;
use crate::message::StreamMessage;
use crate::metrics::StreamMetrics;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const MAX_BACKOFF_SECS: u64 = 30;

/// What the worker does with a message once the processor returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledge; the group never delivers it again
    Ack,
    /// Leave pending; it is reclaimed after `claim_idle_ms` and
    /// dead-lettered on the delivery after the `max_deliveries`-th
    Retain,
}

/// Domain handlers implement this to consume a stream.
///
/// ```rust,ignore
/// struct AuditProcessor;
///
/// #[async_trait]
/// impl StreamProcessor for AuditProcessor {
///     async fn process(&self, message: &StreamMessage) -> Disposition {
///         match message.payload() {
///             Some(json) => { /* ... */ Disposition::Ack }
///             None => Disposition::Ack,
///         }
///     }
///
///     fn name(&self) -> &'static str {
///         "audit_processor"
///     }
/// }
/// ```
#[async_trait]
pub trait StreamProcessor: Send + Sync {
    async fn process(&self, message: &StreamMessage) -> Disposition;

    fn name(&self) -> &'static str;
}

/// Reads one message at a time from a consumer group and hands it to a processor.
///
/// Messages are never pipelined: the next read only happens after the current
/// message has been acknowledged or retained.
pub struct StreamWorker<P: StreamProcessor> {
    consumer: StreamConsumer,
    dlq: DlqManager,
    processor: Arc<P>,
    config: WorkerConfig,
    metrics: StreamMetrics,
}

impl<P: StreamProcessor> StreamWorker<P> {
    pub fn new(redis: ConnectionManager, processor: P, config: WorkerConfig) -> Self {
        Self::with_arc_processor(redis, Arc::new(processor), config)
    }

    pub fn with_arc_processor(
        redis: ConnectionManager,
        processor: Arc<P>,
        config: WorkerConfig,
    ) -> Self {
        let metrics = StreamMetrics::new(&config.stream_name, processor.name());
        Self {
            consumer: StreamConsumer::new(redis.clone(), config.clone()),
            dlq: DlqManager::new(redis, &config.dlq_stream),
            processor,
            config,
            metrics,
        }
    }

    pub fn consumer(&self) -> &StreamConsumer {
        &self.consumer
    }

    pub fn dlq(&self) -> &DlqManager {
        &self.dlq
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run until `shutdown` flips to `true`.
    ///
    /// A message being processed when the signal arrives is finished first;
    /// nothing else is read afterwards.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            consumer_id = %self.config.consumer_id,
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            processor = self.processor.name(),
            max_deliveries = self.config.max_deliveries,
            "Starting stream worker"
        );

        self.consumer.ensure_consumer_group().await?;

        let claim_interval = self.config.claim_interval();
        let mut last_claim: Option<Instant> = None;
        let mut consecutive_errors: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            if last_claim.is_none_or(|t| t.elapsed() >= claim_interval) {
                if let Err(e) = self.reclaim_stale().await {
                    debug!(error = %e, "Error reclaiming stale messages");
                }
                last_claim = Some(Instant::now());
            }

            let wait = match self.process_next().await {
                Ok(handled) => {
                    if consecutive_errors > 0 {
                        info!(consecutive_errors, "Stream connection recovered");
                        consecutive_errors = 0;
                    }
                    if handled {
                        continue;
                    }
                    self.config.poll_interval()
                }
                Err(e) => {
                    consecutive_errors += 1;
                    self.backoff_for(&e, consecutive_errors).await
                }
            };

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        info!(stream = %self.config.stream_name, "Stream worker stopped");
        Ok(())
    }

    /// Read and handle at most one new message. Returns whether one was available.
    pub async fn process_next(&self) -> Result<bool, StreamError> {
        let Some(message) = self.consumer.read_new(1).await?.into_iter().next() else {
            return Ok(false);
        };

        self.handle(message).await?;
        Ok(true)
    }

    /// Redeliver stale pending messages, dead-lettering those past `max_deliveries`.
    /// Returns the number of messages claimed.
    pub async fn reclaim_stale(&self) -> Result<usize, StreamError> {
        let claimed = self.consumer.claim_stale().await?;
        let count = claimed.len();

        if count > 0 {
            self.metrics.messages_claimed(count);
        }

        for message in claimed {
            self.handle(message).await?;
        }

        if let Ok(pending) = self.consumer.pending_count().await {
            self.metrics.pending_count(pending);
        }

        Ok(count)
    }

    async fn handle(&self, message: StreamMessage) -> Result<(), StreamError> {
        if self.config.deliveries_exhausted(message.deliveries) {
            self.dlq
                .move_to_dlq(&message, "max deliveries exceeded")
                .await?;
            self.consumer.ack(&message.id).await?;
            self.metrics.message_dead_lettered();
            return Ok(());
        }

        self.metrics.message_received();
        let start = Instant::now();

        match self.processor.process(&message).await {
            Disposition::Ack => {
                self.consumer.ack(&message.id).await?;
                self.metrics.message_acked(start.elapsed());
            }
            Disposition::Retain => {
                debug!(
                    stream_id = %message.id,
                    deliveries = message.deliveries,
                    "Message left pending"
                );
                self.metrics.message_retained();
            }
        }

        Ok(())
    }

    async fn backoff_for(&self, e: &StreamError, consecutive_errors: u32) -> Duration {
        if e.is_nogroup_error() {
            warn!("Consumer group missing, recreating");
            if let Err(create_err) = self.consumer.ensure_consumer_group().await {
                error!(error = %create_err, "Failed to recreate consumer group");
            }
            return Duration::from_secs(1);
        }

        if e.is_connection_error() {
            let backoff_secs = 2u64.pow(consecutive_errors.min(5)).min(MAX_BACKOFF_SECS);
            warn!(
                error = %e,
                consecutive_errors,
                backoff_secs,
                "Redis connection error, backing off"
            );
            return Duration::from_secs(backoff_secs);
        }

        error!(error = %e, "Error processing stream");
        Duration::from_secs(1)
    }
}
