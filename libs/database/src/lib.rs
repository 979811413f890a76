//! Connectors and health probes for the user service's backing stores.
//!
//! # Features
//!
//! - `postgres` (default) - PostgreSQL through SeaORM, plus migration running
//! - `redis` (default) - Redis `ConnectionManager` used by the notification stream
//! - `config` - `core_config::FromEnv` implementations for the config types
//!
//! # Example
//!
//! ```ignore
//! use database::{postgres, redis};
//!
//! let db = postgres::connect_from_config_with_retry(pg_config, None).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "users_api").await?;
//!
//! let conn = redis::connect("redis://127.0.0.1:6379").await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult, RetryConfig};
