//! Redis cache implementation

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::OnceCell;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Upper bound for connecting and for every individual command
    pub operation_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            operation_timeout: Duration::from_millis(500),
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

/// Redis cache implementation
///
/// The connection is opened on first use and then shared. A failed connect
/// leaves it unset, so the next call retries; until then every operation
/// returns a cache error. Once open, the `ConnectionManager` reconnects on
/// its own after a dropped connection.
pub struct RedisCache {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

impl RedisCache {
    /// Creates a Redis cache. Only the URL is checked here; nothing is dialed
    /// until the first command.
    pub fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::configuration(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
            config,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, DomainError> {
        self.connection
            .get_or_try_init(|| async {
                tokio::time::timeout(
                    self.config.operation_timeout,
                    ConnectionManager::new(self.client.clone()),
                )
                .await
                .map_err(|_| DomainError::cache("Timed out connecting to Redis"))?
                .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))
            })
            .await
            .cloned()
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Run a command under the configured timeout
    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DomainError::cache(format!("Failed to {}: {}", what, e))),
            Err(_) => Err(DomainError::cache(format!(
                "Timed out after {:?} trying to {}",
                self.config.operation_timeout, what
            ))),
        }
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection().await?;
        let mut cursor = 0u64;
        let mut found = Vec::new();

        // SCAN instead of KEYS so the server is never blocked on a large keyspace
        loop {
            let (new_cursor, keys): (u64, Vec<String>) = self
                .bounded(
                    &format!("scan keys with pattern '{}'", pattern),
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(100)
                        .query_async(&mut conn),
                )
                .await?;

            found.extend(keys);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection().await?;

        self.bounded(&format!("get key '{}'", key), conn.get(&prefixed_key))
            .await
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection().await?;

        let ttl_secs = ttl.as_secs().max(1);

        self.bounded(
            &format!("set key '{}'", key),
            conn.set_ex::<_, _, ()>(&prefixed_key, value, ttl_secs),
        )
        .await
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let keys = self.scan_keys(&self.prefix_key(pattern)).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection().await?;
        let deleted: i32 = self.bounded("delete keys", conn.del(&keys)).await?;

        Ok(deleted as usize)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection().await?;

        self.bounded(
            &format!("check existence of key '{}'", key),
            conn.exists(&prefixed_key),
        )
        .await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection().await?;
        let _: String = self
            .bounded("ping", redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }
}
