//! Users Domain
//!
//! User lifecycle management plus the change-notification pipeline that
//! feeds downstream consumers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐      ┌────────────┐      ┌──────────────┐
//! │   Service   │ ───► │  Notifier  │ ───► │ users:events │
//! └──────┬──────┘      └────────────┘      └──────┬───────┘
//!        │                                        │
//! ┌──────▼──────┐                          ┌──────▼───────┐
//! │ Repository  │                          │  Subscriber  │ ─► EventHandler
//! └─────────────┘                          └──────────────┘
//! ```
//!
//! - The service validates, pre-checks email and nickname uniqueness, hashes
//!   passwords with Argon2 and persists through [`UserRepository`]
//! - Mutations publish `user.created` / `user.updated` / `user.deleted` from a
//!   detached task with its own timeout
//! - [`NotificationSubscriber`] consumes the stream one message at a time
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_users::{handlers, InMemoryUserRepository, LoggingNotifier, UserService};
//! use std::sync::Arc;
//!
//! let service = UserService::new(InMemoryUserRepository::new(), Arc::new(LoggingNotifier));
//! let router = handlers::router(service);
//! ```

pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod postgres_repository_impl;
pub mod repository;
pub mod service;
pub mod streams;
pub mod subscriber;
pub mod validation;

// Re-export commonly used types
pub use error::{UserError, UserResult};
pub use events::{Event, EventType};
pub use handlers::ApiDoc;
pub use models::{
    CreateUser, ListUsersQuery, ListUsersResponse, MessageResponse, Pagination, UpdatePassword,
    UpdateUser, User, UserFilter, UserResponse,
};
pub use notifier::{
    LoggingNotifier, NotificationError, Notifier, RecordingNotifier, StreamNotifier,
};
pub use postgres_repository_impl::PostgresUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
pub use streams::UserEventStream;
pub use subscriber::{
    EventHandler, HandlerResult, LoggingEventHandler, NotificationSubscriber, UserEventProcessor,
};
