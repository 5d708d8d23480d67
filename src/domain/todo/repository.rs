//! Todo repository trait

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::entity::{NewTodo, Todo, TodoId};
use super::page::{Page, PageRequest};
use crate::domain::DomainError;

/// Durable store for todo records. Every page query orders by `created_at`
/// descending, ties broken by id descending.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TodoRepository: Send + Sync + std::fmt::Debug {
    /// Insert a new record, returning it with the assigned id
    async fn insert(&self, todo: NewTodo) -> Result<Todo, DomainError>;

    /// Find a record by id
    async fn find_by_id(&self, id: TodoId) -> Result<Option<Todo>, DomainError>;

    /// Overwrite an existing record
    async fn save(&self, todo: Todo) -> Result<Todo, DomainError>;

    /// Remove a record by id
    async fn delete_by_id(&self, id: TodoId) -> Result<(), DomainError>;

    /// Check if a record exists
    async fn exists_by_id(&self, id: TodoId) -> Result<bool, DomainError>;

    /// Page over all records
    async fn find_page(&self, request: PageRequest) -> Result<Page<Todo>, DomainError>;

    /// Page over records with the given completion flag
    async fn find_page_by_completed(
        &self,
        completed: bool,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError>;

    /// Page over records whose title contains `query`, ignoring case
    async fn find_page_by_title_contains(
        &self,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError>;

    /// Round-trips to the backing store; used by readiness checks
    async fn ping(&self) -> Result<(), DomainError>;
}
