use std::time::Duration;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheConfig, CacheType};
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};
use crate::infrastructure::todo::TodoCachePolicy;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// PostgreSQL connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Falls back to `DATABASE_URL` when unset
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Apply pending migrations when the server starts
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageType,
}

/// Cache backend and TTL settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheType,
    /// Falls back to `REDIS_URL` when unset
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    pub item_ttl_secs: u64,
    pub page_ttl_secs: u64,
    /// Cache list/filter/search pages as well as single items
    pub cache_pages: bool,
    pub max_capacity: u64,
    pub operation_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 5,
            run_migrations: true,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheType::default(),
            redis_url: None,
            key_prefix: None,
            item_ttl_secs: 900,
            page_ttl_secs: 300,
            cache_pages: false,
            max_capacity: 10_000,
            operation_timeout_ms: 500,
        }
    }
}

impl AppConfig {
    /// Load `config/default`, then `config/local`, then `APP__*` variables,
    /// then the conventional `DATABASE_URL`/`REDIS_URL` fallbacks
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = Self::builder().build()?;
        let app: Self = config.try_deserialize()?;

        Ok(app.with_env_fallbacks(|name| std::env::var(name).ok()))
    }

    fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
    }

    /// Fill connection URLs that the layered sources left unset
    pub fn with_env_fallbacks<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.database.url.is_none() {
            self.database.url = lookup("DATABASE_URL");
        }

        if self.cache.redis_url.is_none() {
            self.cache.redis_url = lookup("REDIS_URL");
        }

        self
    }

    pub fn postgres_config(&self) -> Result<PostgresConfig, DomainError> {
        let url = self.database.url.clone().ok_or_else(|| {
            DomainError::configuration(
                "database.url (or DATABASE_URL) is required for the postgres backend",
            )
        })?;

        Ok(PostgresConfig::new(url)
            .with_max_connections(self.database.max_connections)
            .with_acquire_timeout(self.database.acquire_timeout_secs))
    }

    pub fn storage_config(&self) -> Result<StorageConfig, DomainError> {
        match self.storage.backend {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => Ok(StorageConfig::postgres(
                self.postgres_config()?,
                self.database.run_migrations,
            )),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig {
            cache_type: self.cache.backend,
            redis_url: self.cache.redis_url.clone(),
            ..CacheConfig::default()
        }
        .with_max_capacity(self.cache.max_capacity)
        .with_operation_timeout(Duration::from_millis(self.cache.operation_timeout_ms));

        if let Some(prefix) = &self.cache.key_prefix {
            config = config.with_key_prefix(prefix.clone());
        }

        config
    }

    pub fn cache_policy(&self) -> TodoCachePolicy {
        TodoCachePolicy {
            item_ttl: Duration::from_secs(self.cache.item_ttl_secs),
            page_ttl: Duration::from_secs(self.cache.page_ttl_secs),
            cache_pages: self.cache.cache_pages,
        }
    }
}
