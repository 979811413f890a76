//! Stream error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StreamError {
    /// The consumer group vanished (stream deleted or flushed)
    pub fn is_nogroup_error(&self) -> bool {
        matches!(self, StreamError::Redis(e) if e.to_string().contains("NOGROUP"))
    }

    pub fn is_connection_error(&self) -> bool {
        match self {
            StreamError::Redis(e) => {
                e.is_connection_dropped() || e.is_io_error() || e.is_timeout()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error_is_not_connection_error() {
        let err: StreamError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(!err.is_connection_error());
        assert!(!err.is_nogroup_error());
        assert!(err.to_string().starts_with("Serialization error"));
    }

    #[test]
    fn test_io_failure_is_connection_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = StreamError::from(redis::RedisError::from(io));
        assert!(err.is_connection_error());
        assert!(!err.is_nogroup_error());
    }
}
