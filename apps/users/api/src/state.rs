//! Shared application state.

use domain_users::{PostgresUserRepository, UserService};

/// Cloned into every handler; all members are cheap handle clones.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    /// PostgreSQL database connection pool
    pub db: database::postgres::DatabaseConnection,
    /// Present only when `REDIS_URL` is configured
    pub redis: Option<database::redis::ConnectionManager>,
    /// Lifecycle service shared by the user routes and the liveness probe
    pub users: UserService<PostgresUserRepository>,
}
