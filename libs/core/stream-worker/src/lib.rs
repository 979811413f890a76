//! Redis Streams worker framework.
//!
//! - [`StreamProducer`] appends JSON payloads to a capped stream
//! - [`StreamWorker`] consumes through a consumer group, one message at a time,
//!   and acknowledges according to the [`Disposition`] its processor returns
//! - Unacknowledged messages are reclaimed after an idle timeout and moved to a
//!   dead letter stream once they exceed `max_deliveries`
//!
//! ```ignore
//! use stream_worker::{StreamDef, StreamWorker, WorkerConfig};
//!
//! struct AuditStream;
//! impl StreamDef for AuditStream {
//!     const STREAM_NAME: &'static str = "audit:events";
//!     const CONSUMER_GROUP: &'static str = "audit_workers";
//!     const DLQ_STREAM: &'static str = "audit:events:dlq";
//! }
//!
//! let config = WorkerConfig::from_stream_def::<AuditStream>();
//! let worker = StreamWorker::new(redis, AuditProcessor, config);
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
mod consumer;
mod dlq;
mod error;
mod message;
pub mod metrics;
mod producer;
mod registry;
mod worker;

pub use config::WorkerConfig;
pub use consumer::StreamConsumer;
pub use dlq::{DlqEntry, DlqManager};
pub use error::StreamError;
pub use message::StreamMessage;
pub use metrics::{StreamMetrics, init_metrics, render_metrics};
pub use producer::StreamProducer;
pub use registry::{PAYLOAD_FIELD, StreamDef};
pub use worker::{Disposition, StreamProcessor, StreamWorker};
