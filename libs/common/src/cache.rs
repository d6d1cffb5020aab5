//! Redis cache module
//!
//! This module provides functionality for connecting to Redis and performing
//! the basic cache operations the services rely on: get, set with TTL support,
//! delete and small membership sets.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::info;

use crate::error::{CacheError, CacheResult};

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Shared Redis handle
///
/// Wraps a [`ConnectionManager`]: clones share one multiplexed socket, and a
/// dropped socket is re-established on the next command instead of failing
/// every later call.
#[derive(Clone)]
pub struct RedisPool {
    conn: ConnectionManager,
}

impl RedisPool {
    /// Open the Redis connection described by `config`
    pub async fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone())
            .map_err(|e| CacheError::Configuration(format!("Invalid Redis URL: {}", e)))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(CacheError::Connection)?;
        info!(url = %config.url, "Redis connection established");
        Ok(RedisPool { conn })
    }

    /// Set a key-value pair in Redis with optional TTL
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> CacheResult<()> {
        let mut conn = self.conn.clone();

        if let Some(ttl) = ttl_seconds {
            let _: () = conn
                .set_ex(key, value, ttl)
                .await
                .map_err(CacheError::from_command)?;
        } else {
            let _: () = conn
                .set(key, value)
                .await
                .map_err(CacheError::from_command)?;
        }

        Ok(())
    }

    /// Get a value from Redis by key
    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(CacheError::from_command)?;
        Ok(value)
    }

    /// Delete a key from Redis, returning whether it existed
    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await.map_err(CacheError::from_command)?;
        Ok(removed > 0)
    }

    /// Add `member` to the set at `key`, keeping the set alive for at least
    /// `ttl_seconds`
    pub async fn set_add(&self, key: &str, member: &str, ttl_seconds: u64) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);

        let _: () = conn
            .sadd(key, member)
            .await
            .map_err(CacheError::from_command)?;

        // -1 means no expiry yet; never shorten a longer-lived set
        let remaining: i64 = conn.ttl(key).await.map_err(CacheError::from_command)?;
        if remaining < ttl {
            let _: () = conn
                .expire(key, ttl)
                .await
                .map_err(CacheError::from_command)?;
        }
        Ok(())
    }

    /// Remove the set at `key`, returning its members
    pub async fn set_take(&self, key: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let (members,): (Vec<String>,) = redis::pipe()
            .atomic()
            .smembers(key)
            .del(key)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(CacheError::from_command)?;
        Ok(members)
    }

    /// Delete several keys at once, returning how many existed
    pub async fn delete_many(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        conn.del(keys.to_vec())
            .await
            .map_err(CacheError::from_command)
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::from_command)?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_redis_config_default_url() {
        unsafe {
            std::env::remove_var("REDIS_URL");
        }

        let config = RedisConfig::from_env().expect("config should load");
        assert_eq!(config.url, "redis://localhost:6379");
    }

    #[tokio::test]
    async fn test_invalid_url_is_a_configuration_error() {
        let config = RedisConfig {
            url: "not a redis url".to_string(),
        };

        let result = RedisPool::new(&config).await;
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at localhost:6379"]
    async fn test_set_get_delete() -> CacheResult<()> {
        let config = RedisConfig {
            url: "redis://localhost:6379".to_string(),
        };

        let pool = RedisPool::new(&config).await?;
        assert!(pool.health_check().await?);

        let key = "test_key";
        pool.set(key, "test_value", Some(5)).await?;
        assert_eq!(pool.get(key).await?, Some("test_value".to_string()));

        assert!(pool.delete(key).await?);
        assert_eq!(pool.get(key).await?, None);
        assert!(!pool.delete(key).await?);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at localhost:6379"]
    async fn test_sets_are_taken_whole() -> CacheResult<()> {
        let config = RedisConfig {
            url: "redis://localhost:6379".to_string(),
        };
        let pool = RedisPool::new(&config).await?;

        let key = "test_set";
        pool.set_take(key).await?;
        pool.set_add(key, "a", 60).await?;
        pool.set_add(key, "b", 5).await?;

        let mut members = pool.set_take(key).await?;
        members.sort();
        assert_eq!(members, ["a", "b"]);
        assert!(pool.set_take(key).await?.is_empty());
        assert_eq!(pool.delete_many(&[]).await?, 0);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a running Redis at localhost:6379"]
    async fn test_pool_recovers_after_connection_is_killed() -> CacheResult<()> {
        let config = RedisConfig {
            url: "redis://localhost:6379".to_string(),
        };
        let pool = RedisPool::new(&config).await?;
        pool.set("test_reconnect", "before", Some(30)).await?;

        // Drop every other client socket, including the pool's
        let client = Client::open(config.url.clone()).map_err(CacheError::Connection)?;
        let mut admin = client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::Connection)?;
        let _: i64 = redis::cmd("CLIENT")
            .arg("KILL")
            .arg("TYPE")
            .arg("normal")
            .arg("SKIPME")
            .arg("yes")
            .query_async(&mut admin)
            .await
            .map_err(CacheError::from_command)?;

        let mut recovered = None;
        for _ in 0..10 {
            if let Ok(value) = pool.get("test_reconnect").await {
                recovered = value;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        assert_eq!(recovered.as_deref(), Some("before"));

        pool.delete("test_reconnect").await?;
        Ok(())
    }
}
