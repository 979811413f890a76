use axum::Router;
use domain_users::{
    LoggingNotifier, Notifier, PostgresUserRepository, StreamNotifier, UserService, handlers,
};
use std::sync::Arc;

use crate::config::Config;
use database::postgres::DatabaseConnection;
use database::redis::ConnectionManager;

/// Queue-backed notifier when Redis is configured, logging fallback otherwise
pub fn notifier(config: &Config, redis: Option<&ConnectionManager>) -> Arc<dyn Notifier> {
    match redis {
        Some(redis) => Arc::new(
            StreamNotifier::new(redis.clone()).with_stream_name(&config.notifications.stream),
        ),
        None => Arc::new(LoggingNotifier),
    }
}

pub fn service(
    config: &Config,
    db: &DatabaseConnection,
    redis: Option<&ConnectionManager>,
) -> UserService<PostgresUserRepository> {
    let repository = PostgresUserRepository::new(db.clone());
    UserService::new(repository, notifier(config, redis))
        .with_publish_timeout(config.notifications.publish_timeout())
}

pub fn router(state: &crate::AppState) -> Router {
    handlers::router(state.users.clone())
}
