//! Todo service
//!
//! HTTP API for todo items with:
//! - CRUD plus paged listing, completion filtering and title search
//! - PostgreSQL or in-memory storage
//! - Read-through caching over Redis or an in-process cache

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use infrastructure::cache::CacheFactory;
use infrastructure::storage::StorageFactory;
use infrastructure::todo::TodoService;
use tracing::info;

/// Create the application state from configuration: connects the store,
/// migrating it when configured, and builds the cache. An unreachable cache
/// is logged and tolerated; a store that cannot be reached fails startup.
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let repository = StorageFactory::create(&config.storage_config()?).await?;
    let cache = CacheFactory::new().create(&config.cache_config()).await?;
    let policy = config.cache_policy();

    info!(
        item_ttl_secs = policy.item_ttl.as_secs(),
        page_ttl_secs = policy.page_ttl.as_secs(),
        cache_pages = policy.cache_pages,
        "Todo service ready"
    );

    let service = TodoService::with_policy(repository, cache, policy);

    Ok(AppState::new(Arc::new(service)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::CacheType;
    use crate::infrastructure::storage::StorageType;

    #[tokio::test]
    async fn test_in_memory_state_is_ready() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageType::InMemory;

        let state = create_app_state_with_config(&config).await.unwrap();

        assert!(state.todo_service.readiness().await.is_ready());
    }

    #[tokio::test]
    async fn test_unreachable_redis_starts_degraded() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageType::InMemory;
        config.cache.backend = CacheType::Redis;
        config.cache.redis_url = Some("redis://127.0.0.1:1".to_string());
        config.cache.operation_timeout_ms = 200;

        let state = create_app_state_with_config(&config).await.unwrap();
        let readiness = state.todo_service.readiness().await;

        assert!(readiness.is_ready());
        assert!(readiness.is_degraded());
    }

    #[tokio::test]
    async fn test_postgres_without_url_fails() {
        let config = AppConfig::default();
        assert!(create_app_state_with_config(&config).await.is_err());
    }
}
