//! Application state for shared services

use std::sync::Arc;

use crate::domain::todo::{Page, PageRequest, Todo, TodoId, TodoRepository};
use crate::domain::DomainError;
use crate::infrastructure::todo::{CreateTodoRequest, TodoService, UpdateTodoRequest};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub todo_service: Arc<dyn TodoServiceTrait>,
}

/// Outcome of probing the service's dependencies
#[derive(Debug)]
pub struct Readiness {
    pub store: Result<(), DomainError>,
    pub cache: Result<(), DomainError>,
}

impl Readiness {
    /// The store is the only hard dependency; reads fall through a failing cache
    pub fn is_ready(&self) -> bool {
        self.store.is_ok()
    }

    pub fn is_degraded(&self) -> bool {
        self.is_ready() && self.cache.is_err()
    }
}

/// Trait for todo service operations
#[async_trait::async_trait]
pub trait TodoServiceTrait: Send + Sync {
    async fn create(&self, request: CreateTodoRequest) -> Result<Todo, DomainError>;
    async fn get(&self, id: TodoId) -> Result<Todo, DomainError>;
    async fn list(&self, request: PageRequest) -> Result<Page<Todo>, DomainError>;
    async fn update(&self, id: TodoId, request: UpdateTodoRequest) -> Result<Todo, DomainError>;
    async fn delete(&self, id: TodoId) -> Result<(), DomainError>;
    async fn filter_by_completed(
        &self,
        completed: bool,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError>;
    async fn search_by_title(
        &self,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError>;
    /// Probe the store and the cache
    async fn readiness(&self) -> Readiness;
}

#[async_trait::async_trait]
impl<R: TodoRepository + ?Sized + 'static> TodoServiceTrait for TodoService<R> {
    async fn create(&self, request: CreateTodoRequest) -> Result<Todo, DomainError> {
        TodoService::create(self, request).await
    }

    async fn get(&self, id: TodoId) -> Result<Todo, DomainError> {
        TodoService::get_by_id(self, id).await
    }

    async fn list(&self, request: PageRequest) -> Result<Page<Todo>, DomainError> {
        TodoService::list_all(self, request).await
    }

    async fn update(&self, id: TodoId, request: UpdateTodoRequest) -> Result<Todo, DomainError> {
        TodoService::update(self, id, request).await
    }

    async fn delete(&self, id: TodoId) -> Result<(), DomainError> {
        TodoService::delete(self, id).await
    }

    async fn filter_by_completed(
        &self,
        completed: bool,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError> {
        TodoService::filter_by_completed(self, completed, request).await
    }

    async fn search_by_title(
        &self,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError> {
        TodoService::search_by_title(self, query, request).await
    }

    async fn readiness(&self) -> Readiness {
        let (store, cache) = self.check_dependencies().await;
        Readiness { store, cache }
    }
}

impl AppState {
    pub fn new(todo_service: Arc<dyn TodoServiceTrait>) -> Self {
        Self { todo_service }
    }
}
