use core_config::{
    AppInfo, ConfigError, FromEnv, app_info, env_or_default, env_parse, server::ServerConfig,
};
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;
use domain_users::UserEventStream;
use std::time::Duration;
use stream_worker::{StreamDef, WorkerConfig};

pub use core_config::Environment;

/// Change-notification settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationConfig {
    pub stream: String,
    pub consumer_group: String,
    /// When false the group is declared but nothing consumes it
    pub enable_consumer: bool,
    pub max_deliveries: u64,
    pub claim_idle_ms: u64,
    pub poll_interval_ms: u64,
    pub publish_timeout_secs: u64,
}

impl NotificationConfig {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::new(&self.stream, &self.consumer_group)
            .with_max_deliveries(self.max_deliveries)
            .with_claim_idle_ms(self.claim_idle_ms)
            .with_poll_interval_ms(self.poll_interval_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}

impl FromEnv for NotificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            stream: env_or_default("NOTIFICATION_STREAM", UserEventStream::STREAM_NAME),
            consumer_group: env_or_default(
                "NOTIFICATION_CONSUMER_GROUP",
                UserEventStream::CONSUMER_GROUP,
            ),
            enable_consumer: env_parse("NOTIFICATION_ENABLE_CONSUMER", "false")?,
            max_deliveries: env_parse("NOTIFICATION_MAX_DELIVERIES", "5")?,
            claim_idle_ms: env_parse("NOTIFICATION_CLAIM_IDLE_MS", "30000")?,
            poll_interval_ms: env_parse("NOTIFICATION_POLL_INTERVAL_MS", "500")?,
            publish_timeout_secs: env_parse("NOTIFICATION_PUBLISH_TIMEOUT_SECS", "5")?,
        })
    }
}

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: PostgresConfig,
    /// Absent: events are logged instead of published, no subscriber runs
    pub redis: Option<RedisConfig>,
    pub notifications: NotificationConfig,
    pub run_migrations: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            app: app_info!(),
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            database: PostgresConfig::from_env()?, // Required - will fail if not set
            redis: RedisConfig::from_env_optional(),
            notifications: NotificationConfig::from_env()?,
            run_migrations: env_parse("DB_RUN_MIGRATIONS", "true")?,
            log_level: env_or_default("LOG_LEVEL", "info"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_defaults() {
        temp_env::with_vars_unset(
            [
                "NOTIFICATION_STREAM",
                "NOTIFICATION_CONSUMER_GROUP",
                "NOTIFICATION_ENABLE_CONSUMER",
                "NOTIFICATION_MAX_DELIVERIES",
                "NOTIFICATION_CLAIM_IDLE_MS",
                "NOTIFICATION_POLL_INTERVAL_MS",
                "NOTIFICATION_PUBLISH_TIMEOUT_SECS",
            ],
            || {
                let config = NotificationConfig::from_env().unwrap();
                assert_eq!(config.stream, "users:events");
                assert_eq!(config.consumer_group, "user_notification_workers");
                assert!(!config.enable_consumer);
                assert_eq!(config.publish_timeout(), Duration::from_secs(5));

                let worker = config.worker_config();
                assert_eq!(worker.dlq_stream, "users:events:dlq");
                assert_eq!(worker.max_deliveries, 5);
                assert_eq!(worker.claim_idle_ms, 30_000);
            },
        );
    }

    #[test]
    fn test_notification_overrides() {
        temp_env::with_vars(
            [
                ("NOTIFICATION_STREAM", Some("staging:users")),
                ("NOTIFICATION_ENABLE_CONSUMER", Some("true")),
                ("NOTIFICATION_MAX_DELIVERIES", Some("3")),
            ],
            || {
                let config = NotificationConfig::from_env().unwrap();
                assert_eq!(config.stream, "staging:users");
                assert!(config.enable_consumer);
                assert_eq!(config.worker_config().dlq_stream, "staging:users:dlq");
                assert_eq!(config.worker_config().max_deliveries, 3);
            },
        );
    }

    #[test]
    fn test_invalid_flag_is_an_error() {
        temp_env::with_var("NOTIFICATION_ENABLE_CONSUMER", Some("sometimes"), || {
            let err = NotificationConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("NOTIFICATION_ENABLE_CONSUMER"));
        });
    }

    #[test]
    fn test_config_without_redis() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/users")),
                ("REDIS_URL", None),
                ("DB_RUN_MIGRATIONS", None),
                ("APP_NAME", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert!(config.redis.is_none());
                assert!(config.run_migrations);
                assert_eq!(config.app.name, "users_api");
            },
        );
    }

    #[test]
    fn test_config_requires_database_url() {
        temp_env::with_var_unset("DATABASE_URL", || {
            assert!(Config::from_env().is_err());
        });
    }
}
