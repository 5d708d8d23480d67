//! In-memory todo repository implementation

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::todo::{NewTodo, Page, PageRequest, Todo, TodoId, TodoRepository};
use crate::domain::DomainError;

/// In-memory implementation of TodoRepository, for development and tests.
/// Ids come from a process-local sequence starting at 1.
#[derive(Debug)]
pub struct InMemoryTodoRepository {
    todos: RwLock<BTreeMap<TodoId, Todo>>,
    sequence: AtomicI64,
}

impl InMemoryTodoRepository {
    /// Creates a new empty repository
    pub fn new() -> Self {
        Self {
            todos: RwLock::new(BTreeMap::new()),
            sequence: AtomicI64::new(1),
        }
    }

    fn page_where<F>(&self, request: PageRequest, predicate: F) -> Result<Page<Todo>, DomainError>
    where
        F: Fn(&Todo) -> bool,
    {
        let todos = self
            .todos
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let mut matching: Vec<&Todo> = todos.values().filter(|&t| predicate(t)).collect();
        matching.sort_by_key(|t| Reverse((t.created_at(), t.id())));

        let total = matching.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);

        let content = matching
            .into_iter()
            .skip(offset)
            .take(request.size as usize)
            .cloned()
            .collect();

        Ok(Page::new(content, total, request))
    }
}

impl Default for InMemoryTodoRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn insert(&self, todo: NewTodo) -> Result<Todo, DomainError> {
        let mut todos = self
            .todos
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        let id = TodoId::new(self.sequence.fetch_add(1, Ordering::SeqCst));
        let todo = todo.into_todo(id);

        todos.insert(id, todo.clone());
        Ok(todo)
    }

    async fn find_by_id(&self, id: TodoId) -> Result<Option<Todo>, DomainError> {
        let todos = self
            .todos
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(todos.get(&id).cloned())
    }

    async fn save(&self, todo: Todo) -> Result<Todo, DomainError> {
        let mut todos = self
            .todos
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        match todos.get_mut(&todo.id()) {
            Some(existing) => {
                *existing = todo.clone();
                Ok(todo)
            }
            None => Err(DomainError::not_found(todo.id())),
        }
    }

    async fn delete_by_id(&self, id: TodoId) -> Result<(), DomainError> {
        let mut todos = self
            .todos
            .write()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        todos.remove(&id);
        Ok(())
    }

    async fn exists_by_id(&self, id: TodoId) -> Result<bool, DomainError> {
        let todos = self
            .todos
            .read()
            .map_err(|_| DomainError::internal("Failed to acquire lock"))?;

        Ok(todos.contains_key(&id))
    }

    async fn find_page(&self, request: PageRequest) -> Result<Page<Todo>, DomainError> {
        self.page_where(request, |_| true)
    }

    async fn find_page_by_completed(
        &self,
        completed: bool,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError> {
        self.page_where(request, |t| t.completed() == completed)
    }

    async fn find_page_by_title_contains(
        &self,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError> {
        let needle = query.to_lowercase();
        self.page_where(request, |t| t.title().to_lowercase().contains(&needle))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
