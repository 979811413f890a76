use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use crate::common::{RetryConfig, retry, retry_with_backoff};

/// Open a `ConnectionManager` and verify it with `PING`.
///
/// The manager reconnects on its own after the initial handshake, so callers
/// can clone it freely. Long-running consumers should open their own manager
/// rather than share one with request handlers.
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Connected to Redis");
    Ok(manager)
}

pub async fn connect_with_retry(
    url: &str,
    retry_config: Option<RetryConfig>,
) -> redis::RedisResult<ConnectionManager> {
    match retry_config {
        Some(policy) => retry_with_backoff(|| connect(url), policy).await,
        None => retry(|| connect(url)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let result = connect("not-a-redis-url").await;
        assert!(result.is_err());
    }
}
