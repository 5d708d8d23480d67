//! Storage factory for runtime store selection

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::domain::todo::TodoRepository;
use crate::domain::DomainError;
use crate::infrastructure::todo::{InMemoryTodoRepository, PostgresTodoRepository};

use super::migrations::run_migrations;
use super::postgres::{connect_pool, PostgresConfig};

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    #[serde(alias = "memory", alias = "inmemory")]
    InMemory,
    /// PostgreSQL storage
    #[default]
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory => write!(f, "in_memory"),
            Self::Postgres => write!(f, "postgres"),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// In-memory storage configuration
    InMemory,
    /// PostgreSQL storage configuration
    Postgres {
        pool: PostgresConfig,
        run_migrations: bool,
    },
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres(pool: PostgresConfig, run_migrations: bool) -> Self {
        Self::Postgres {
            pool,
            run_migrations,
        }
    }
}

/// Factory for creating todo stores
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the todo store described by the configuration, applying
    /// pending migrations first when asked to
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn TodoRepository>, DomainError> {
        match config {
            StorageConfig::InMemory => {
                info!("Using in-memory todo store");
                Ok(Arc::new(InMemoryTodoRepository::new()))
            }
            StorageConfig::Postgres {
                pool,
                run_migrations: migrate,
            } => {
                let pool = connect_pool(pool).await?;

                if *migrate {
                    let applied = run_migrations(&pool).await?;
                    info!(applied, "Database migrations up to date");
                }

                info!("Using PostgreSQL todo store");
                Ok(Arc::new(PostgresTodoRepository::new(pool)))
            }
        }
    }
}
