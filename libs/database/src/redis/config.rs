#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_optional, env_required};

/// Redis connection settings.
///
/// Redis is optional for the user service: without it, change notifications
/// are only logged and no subscriber runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedisConfig {
    /// e.g. `redis://:password@127.0.0.1:6379/0`
    pub url: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "config")]
impl RedisConfig {
    /// `None` when `REDIS_URL` is unset or blank
    pub fn from_env_optional() -> Option<Self> {
        env_optional("REDIS_URL").map(Self::new)
    }
}

#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(env_required("REDIS_URL")?))
    }
}

#[cfg(all(test, feature = "config"))]
mod tests {
    use super::*;

    #[test]
    fn test_redis_config_from_env() {
        temp_env::with_var("REDIS_URL", Some("redis://localhost:6379"), || {
            let config = RedisConfig::from_env().unwrap();
            assert_eq!(config.url(), "redis://localhost:6379");
        });
    }

    #[test]
    fn test_redis_config_optional_when_unset() {
        temp_env::with_var_unset("REDIS_URL", || {
            assert!(RedisConfig::from_env_optional().is_none());
            assert!(RedisConfig::from_env().is_err());
        });
    }

    #[test]
    fn test_redis_config_optional_blank_is_unset() {
        temp_env::with_var("REDIS_URL", Some(""), || {
            assert!(RedisConfig::from_env_optional().is_none());
        });
    }
}
