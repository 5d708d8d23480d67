//! Todo service: store access fronted by a read-through cache

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::cache::{Cache, CacheExt, TodoCacheKeys};
use crate::domain::todo::{NewTodo, Page, PageRequest, Priority, Todo, TodoId, TodoRepository};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_cache_event, record_todo_mutation, CacheOutcome};

/// Request for creating a new todo
#[derive(Debug, Clone, Default)]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<String>,
}

impl CreateTodoRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<String>,
}

/// How the service uses the cache
#[derive(Debug, Clone, Copy)]
pub struct TodoCachePolicy {
    /// Lifetime of single-item entries
    pub item_ttl: Duration,
    /// Lifetime of cached list/filter/search pages
    pub page_ttl: Duration,
    /// Whether page queries are cached at all
    pub cache_pages: bool,
}

impl Default for TodoCachePolicy {
    fn default() -> Self {
        Self {
            item_ttl: Duration::from_secs(15 * 60),
            page_ttl: Duration::from_secs(5 * 60),
            cache_pages: false,
        }
    }
}

/// Todo service owning defaulting, partial updates and cache invalidation.
///
/// Cache failures never fail an operation: they are logged, counted and the
/// store is used instead.
#[derive(Debug)]
pub struct TodoService<R: TodoRepository + ?Sized> {
    repository: Arc<R>,
    cache: Arc<dyn Cache>,
    policy: TodoCachePolicy,
}

impl<R: TodoRepository + ?Sized> TodoService<R> {
    /// Create a new todo service
    pub fn new(repository: Arc<R>, cache: Arc<dyn Cache>) -> Self {
        Self::with_policy(repository, cache, TodoCachePolicy::default())
    }

    pub fn with_policy(repository: Arc<R>, cache: Arc<dyn Cache>, policy: TodoCachePolicy) -> Self {
        Self {
            repository,
            cache,
            policy,
        }
    }

    /// Create a todo, defaulting `completed` to false and `priority` to MEDIUM
    pub async fn create(&self, request: CreateTodoRequest) -> Result<Todo, DomainError> {
        info!(title = %request.title, "Creating todo");

        let mut draft = NewTodo::new(request.title)
            .with_completed(request.completed.unwrap_or(false))
            .with_priority(request.priority.unwrap_or_default());

        draft.description = request.description;
        draft.due_date = request.due_date;
        draft.tags = request.tags;

        let todo = self.repository.insert(draft).await?;

        self.evict_all().await;
        record_todo_mutation("create");

        Ok(todo)
    }

    /// Get a todo by id, reading through the cache
    pub async fn get_by_id(&self, id: TodoId) -> Result<Todo, DomainError> {
        let key = TodoCacheKeys::item(id);

        if let Some(todo) = self.cache_get::<Todo>("item", &key).await {
            debug!(%id, "Todo served from cache");
            return Ok(todo);
        }

        let todo = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(id))?;

        self.cache_put("item", &key, &todo, self.policy.item_ttl)
            .await;

        Ok(todo)
    }

    /// Page over all todos, newest first
    pub async fn list_all(&self, request: PageRequest) -> Result<Page<Todo>, DomainError> {
        self.cached_page(TodoCacheKeys::list(request), || {
            self.repository.find_page(request)
        })
        .await
    }

    /// Apply a partial update. The record is read from the store, never from
    /// the cache, and `updated_at` advances even when nothing else changes.
    pub async fn update(&self, id: TodoId, request: UpdateTodoRequest) -> Result<Todo, DomainError> {
        info!(%id, "Updating todo");

        let mut todo = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(id))?;

        if let Some(title) = request.title {
            todo.set_title(title);
        }

        if let Some(description) = request.description {
            todo.set_description(description);
        }

        if let Some(completed) = request.completed {
            todo.set_completed(completed);
        }

        if let Some(priority) = request.priority {
            todo.set_priority(priority);
        }

        if let Some(due_date) = request.due_date {
            todo.set_due_date(due_date);
        }

        if let Some(tags) = request.tags {
            todo.set_tags(tags);
        }

        todo.touch();

        let todo = self.repository.save(todo).await?;

        self.evict_all().await;
        record_todo_mutation("update");

        Ok(todo)
    }

    /// Delete a todo. An absent id is reported without touching the store's
    /// delete path.
    pub async fn delete(&self, id: TodoId) -> Result<(), DomainError> {
        info!(%id, "Deleting todo");

        if !self.repository.exists_by_id(id).await? {
            return Err(DomainError::not_found(id));
        }

        self.repository.delete_by_id(id).await?;

        self.evict_all().await;
        record_todo_mutation("delete");

        Ok(())
    }

    /// Page over todos with the given completion flag
    pub async fn filter_by_completed(
        &self,
        completed: bool,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError> {
        self.cached_page(TodoCacheKeys::filter(completed, request), || {
            self.repository.find_page_by_completed(completed, request)
        })
        .await
    }

    /// Page over todos whose title contains `query`, ignoring case
    pub async fn search_by_title(
        &self,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError> {
        self.cached_page(TodoCacheKeys::search(query, request), || {
            self.repository.find_page_by_title_contains(query, request)
        })
        .await
    }

    /// Readiness of the store and the cache, in that order
    pub async fn check_dependencies(&self) -> (Result<(), DomainError>, Result<(), DomainError>) {
        let store = self.repository.ping().await;
        let cache = self.cache.ping().await;
        (store, cache)
    }

    async fn cached_page<F, Fut>(&self, key: String, load: F) -> Result<Page<Todo>, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Page<Todo>, DomainError>>,
    {
        if !self.policy.cache_pages {
            return load().await;
        }

        if let Some(page) = self.cache_get::<Page<Todo>>("page", &key).await {
            return Ok(page);
        }

        let page = load().await?;
        self.cache_put("page", &key, &page, self.policy.page_ttl)
            .await;

        Ok(page)
    }

    async fn cache_get<V>(&self, scope: &'static str, key: &str) -> Option<V>
    where
        V: DeserializeOwned + Send,
    {
        match self.cache.get::<V>(key).await {
            Ok(Some(value)) => {
                record_cache_event(scope, CacheOutcome::Hit);
                Some(value)
            }
            Ok(None) => {
                record_cache_event(scope, CacheOutcome::Miss);
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, falling back to store");
                record_cache_event(scope, CacheOutcome::Error);
                None
            }
        }
    }

    async fn cache_put<V>(&self, scope: &'static str, key: &str, value: &V, ttl: Duration)
    where
        V: Serialize + Send + Sync,
    {
        match self.cache.set(key, value, ttl).await {
            Ok(()) => record_cache_event(scope, CacheOutcome::Write),
            Err(e) => {
                warn!(key, error = %e, "Cache write failed");
                record_cache_event(scope, CacheOutcome::Error);
            }
        }
    }

    /// Drop every entry in the todo namespace
    async fn evict_all(&self) {
        let pattern = TodoCacheKeys::namespace_pattern();

        match self.cache.delete_pattern(&pattern).await {
            Ok(evicted) => {
                debug!(evicted, "Evicted todo cache namespace");
                record_cache_event("namespace", CacheOutcome::Eviction);
            }
            Err(e) => {
                warn!(error = %e, "Cache eviction failed; entries expire with their TTL");
                record_cache_event("namespace", CacheOutcome::Error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::todo::MockTodoRepository;
    use crate::infrastructure::todo::InMemoryTodoRepository;
    use mockall::predicate::eq;

    fn service_with(cache: Arc<MockCache>) -> TodoService<InMemoryTodoRepository> {
        TodoService::new(Arc::new(InMemoryTodoRepository::new()), cache)
    }

    fn page_caching() -> TodoCachePolicy {
        TodoCachePolicy {
            cache_pages: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults() {
        let service = service_with(Arc::new(MockCache::new()));

        let todo = service
            .create(CreateTodoRequest::new("Buy milk"))
            .await
            .unwrap();

        assert!(!todo.completed());
        assert_eq!(todo.priority(), Priority::Medium);
        assert_eq!(todo.created_at(), todo.updated_at());
        assert!(todo.id().value() > 0);
    }

    #[tokio::test]
    async fn test_create_keeps_supplied_fields() {
        let service = service_with(Arc::new(MockCache::new()));
        let due = crate::domain::todo::timestamp_now();

        let todo = service
            .create(CreateTodoRequest {
                title: "Ship release".to_string(),
                description: Some("v2".to_string()),
                completed: Some(true),
                priority: Some(Priority::High),
                due_date: Some(due),
                tags: Some("work,release".to_string()),
            })
            .await
            .unwrap();

        assert!(todo.completed());
        assert_eq!(todo.priority(), Priority::High);
        assert_eq!(todo.description(), Some("v2"));
        assert_eq!(todo.due_date(), Some(due));
        assert_eq!(todo.tags(), Some("work,release"));
    }

    #[tokio::test]
    async fn test_get_by_id_populates_cache_with_item_ttl() {
        let cache = Arc::new(MockCache::new());
        let service = service_with(cache.clone());

        let created = service.create(CreateTodoRequest::new("a")).await.unwrap();
        let key = TodoCacheKeys::item(created.id());
        assert!(!cache.contains(&key));

        let fetched = service.get_by_id(created.id()).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(cache.ttl_of(&key), Some(Duration::from_secs(900)));
    }

    #[tokio::test]
    async fn test_get_by_id_prefers_cache() {
        let mut repository = MockTodoRepository::new();
        repository.expect_find_by_id().never();

        let cached = NewTodo::new("cached").into_todo(TodoId::new(5));
        let cache = Arc::new(MockCache::new());
        cache.insert_raw(
            &TodoCacheKeys::item(cached.id()),
            &serde_json::to_string(&cached).unwrap(),
        );

        let service = TodoService::new(Arc::new(repository), cache);

        let todo = service.get_by_id(TodoId::new(5)).await.unwrap();
        assert_eq!(todo, cached);
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_not_found_and_not_cached() {
        let cache = Arc::new(MockCache::new());
        let service = service_with(cache.clone());

        let result = service.get_by_id(TodoId::new(404)).await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(cache.set_calls(), 0);
    }

    #[tokio::test]
    async fn test_get_by_id_falls_back_to_store_when_cache_fails() {
        let cache = Arc::new(MockCache::new());
        let service = service_with(cache.clone());
        let created = service.create(CreateTodoRequest::new("a")).await.unwrap();

        cache.set_failing(true);

        let fetched = service.get_by_id(created.id()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_writes_succeed_when_cache_fails() {
        let cache = Arc::new(MockCache::failing());
        let service = service_with(cache.clone());

        let created = service.create(CreateTodoRequest::new("a")).await.unwrap();
        let updated = service
            .update(
                created.id(),
                UpdateTodoRequest {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        service.delete(created.id()).await.unwrap();

        assert!(updated.completed());
        assert_eq!(cache.eviction_calls(), 3);
    }

    #[tokio::test]
    async fn test_every_write_evicts_namespace() {
        let cache = Arc::new(MockCache::new());
        let service = service_with(cache.clone());

        let created = service.create(CreateTodoRequest::new("a")).await.unwrap();
        service.get_by_id(created.id()).await.unwrap();
        assert!(cache.contains(&TodoCacheKeys::item(created.id())));

        service
            .update(created.id(), UpdateTodoRequest::default())
            .await
            .unwrap();

        assert!(!cache.contains(&TodoCacheKeys::item(created.id())));
        assert_eq!(cache.eviction_calls(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_does_not_save() {
        let mut repository = MockTodoRepository::new();
        repository
            .expect_find_by_id()
            .with(eq(TodoId::new(9)))
            .times(1)
            .returning(|_| Ok(None));
        repository.expect_save().never();
        repository.expect_insert().never();

        let service = TodoService::new(Arc::new(repository), Arc::new(MockCache::new()));

        let result = service
            .update(
                TodoId::new(9),
                UpdateTodoRequest {
                    title: Some("x".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_reads_store_not_cache() {
        let cache = Arc::new(MockCache::new());
        let service = service_with(cache.clone());
        let created = service.create(CreateTodoRequest::new("fresh")).await.unwrap();

        let mut stale = created.clone();
        stale.set_title("stale");
        cache.insert_raw(
            &TodoCacheKeys::item(created.id()),
            &serde_json::to_string(&stale).unwrap(),
        );

        let updated = service
            .update(
                created.id(),
                UpdateTodoRequest {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title(), "fresh");
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let service = service_with(Arc::new(MockCache::new()));

        let created = service
            .create(CreateTodoRequest {
                title: "Draft".to_string(),
                description: Some("keep me".to_string()),
                priority: Some(Priority::Low),
                tags: Some("home".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let updated = service
            .update(
                created.id(),
                UpdateTodoRequest {
                    title: Some("Final".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title(), "Final");
        assert_eq!(updated.description(), Some("keep me"));
        assert_eq!(updated.priority(), Priority::Low);
        assert_eq!(updated.tags(), Some("home"));
        assert!(!updated.completed());
        assert_eq!(updated.created_at(), created.created_at());
        assert!(updated.updated_at() > created.updated_at());
    }

    #[tokio::test]
    async fn test_empty_update_still_advances_updated_at() {
        let service = service_with(Arc::new(MockCache::new()));
        let created = service.create(CreateTodoRequest::new("a")).await.unwrap();

        let first = service
            .update(created.id(), UpdateTodoRequest::default())
            .await
            .unwrap();
        let second = service
            .update(created.id(), UpdateTodoRequest::default())
            .await
            .unwrap();

        assert!(first.updated_at() > created.updated_at());
        assert!(second.updated_at() > first.updated_at());
    }

    #[tokio::test]
    async fn test_delete_missing_never_calls_delete_by_id() {
        let mut repository = MockTodoRepository::new();
        repository
            .expect_exists_by_id()
            .with(eq(TodoId::new(7)))
            .times(1)
            .returning(|_| Ok(false));
        repository.expect_delete_by_id().never();

        let cache = Arc::new(MockCache::new());
        let service = TodoService::new(Arc::new(repository), cache.clone());

        let result = service.delete(TodoId::new(7)).await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(cache.eviction_calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_present_calls_delete_by_id_once() {
        let mut repository = MockTodoRepository::new();
        repository.expect_exists_by_id().returning(|_| Ok(true));
        repository
            .expect_delete_by_id()
            .with(eq(TodoId::new(3)))
            .times(1)
            .returning(|_| Ok(()));

        let service = TodoService::new(Arc::new(repository), Arc::new(MockCache::new()));

        service.delete(TodoId::new(3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let mut repository = MockTodoRepository::new();
        repository
            .expect_find_page()
            .returning(|_| Err(DomainError::storage("connection refused")));

        let service = TodoService::new(Arc::new(repository), Arc::new(MockCache::new()));

        let result = service.list_all(PageRequest::default()).await;
        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_filter_by_completed_returns_only_matching() {
        let service = service_with(Arc::new(MockCache::new()));

        for (title, completed) in [("a", true), ("b", false), ("c", true)] {
            service
                .create(CreateTodoRequest {
                    title: title.to_string(),
                    completed: Some(completed),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let done = service
            .filter_by_completed(true, PageRequest::default())
            .await
            .unwrap();
        let open = service
            .filter_by_completed(false, PageRequest::default())
            .await
            .unwrap();

        assert_eq!(done.total_elements, 2);
        assert!(done.content.iter().all(|t| t.completed()));
        assert_eq!(open.total_elements, 1);
        assert!(open.content.iter().all(|t| !t.completed()));
    }

    #[tokio::test]
    async fn test_filter_by_completed_pages_are_newest_first() {
        let service = service_with(Arc::new(MockCache::new()));

        for (title, completed) in [
            ("done 1", true),
            ("open 1", false),
            ("done 2", true),
            ("done 3", true),
            ("open 2", false),
            ("done 4", true),
        ] {
            service
                .create(CreateTodoRequest {
                    title: title.to_string(),
                    completed: Some(completed),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let first = service
            .filter_by_completed(true, PageRequest::new(0, 3))
            .await
            .unwrap();
        let second = service
            .filter_by_completed(true, PageRequest::new(1, 3))
            .await
            .unwrap();

        let titles = |page: &Page<Todo>| -> Vec<String> {
            page.content.iter().map(|t| t.title().to_string()).collect()
        };
        assert_eq!(titles(&first), vec!["done 4", "done 3", "done 2"]);
        assert_eq!(titles(&second), vec!["done 1"]);
        assert_eq!(first.total_elements, 4);
        assert_eq!(first.total_pages(), 2);
        assert!(first.content.windows(2).all(|pair| pair[0].created_at() >= pair[1].created_at()));
    }

    #[tokio::test]
    async fn test_search_by_title() {
        let service = service_with(Arc::new(MockCache::new()));

        for title in ["Team Meeting", "meeting notes", "Project Update"] {
            service.create(CreateTodoRequest::new(title)).await.unwrap();
        }

        let page = service
            .search_by_title("meeting", PageRequest::default())
            .await
            .unwrap();

        let titles: Vec<_> = page.content.iter().map(|t| t.title()).collect();
        assert_eq!(page.total_elements, 2);
        assert!(titles.contains(&"Team Meeting"));
        assert!(titles.contains(&"meeting notes"));
        assert!(!titles.contains(&"Project Update"));
    }

    #[tokio::test]
    async fn test_pages_are_newest_first() {
        let service = service_with(Arc::new(MockCache::new()));

        for title in ["first", "second", "third"] {
            service.create(CreateTodoRequest::new(title)).await.unwrap();
        }

        let page = service.list_all(PageRequest::new(0, 2)).await.unwrap();

        assert_eq!(page.content.len(), 2);
        assert_eq!(page.total_elements, 3);
        for pair in page.content.windows(2) {
            assert!(
                (pair[0].created_at(), pair[0].id()) > (pair[1].created_at(), pair[1].id())
            );
        }
        assert_eq!(page.content[0].title(), "third");
    }

    #[tokio::test]
    async fn test_pages_not_cached_by_default() {
        let cache = Arc::new(MockCache::new());
        let service = service_with(cache.clone());

        service.list_all(PageRequest::default()).await.unwrap();

        assert_eq!(cache.get_calls(), 0);
        assert_eq!(cache.set_calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_page_is_dropped_by_next_write() {
        let cache = Arc::new(MockCache::new());
        let service = TodoService::with_policy(
            Arc::new(InMemoryTodoRepository::new()),
            cache.clone(),
            page_caching(),
        );
        let request = PageRequest::default();

        service.create(CreateTodoRequest::new("a")).await.unwrap();
        let before = service.list_all(request).await.unwrap();
        assert_eq!(cache.ttl_of(&TodoCacheKeys::list(request)), Some(Duration::from_secs(300)));

        service.create(CreateTodoRequest::new("b")).await.unwrap();
        let after = service.list_all(request).await.unwrap();

        assert_eq!(before.total_elements, 1);
        assert_eq!(after.total_elements, 2);
    }

    #[tokio::test]
    async fn test_create_update_delete_scenario() {
        let service = service_with(Arc::new(MockCache::new()));

        let created = service
            .create(CreateTodoRequest::new("Buy milk"))
            .await
            .unwrap();
        assert!(!created.completed());
        assert_eq!(created.priority(), Priority::Medium);
        assert_eq!(created.created_at(), created.updated_at());

        let updated = service
            .update(
                created.id(),
                UpdateTodoRequest {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.completed());
        assert_eq!(updated.title(), "Buy milk");
        assert!(updated.updated_at() > updated.created_at());

        service.delete(created.id()).await.unwrap();

        let result = service.get_by_id(created.id()).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_check_dependencies_reports_cache_failure() {
        let service = service_with(Arc::new(MockCache::failing()));

        let (store, cache) = service.check_dependencies().await;

        assert!(store.is_ok());
        assert!(cache.is_err());
    }
}
