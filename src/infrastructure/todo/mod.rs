//! Todo infrastructure module
//!
//! Store implementations (PostgreSQL, in-memory) and the service that fronts
//! them with the read-through cache.

mod in_memory_repository;
mod postgres_repository;
mod service;

pub use in_memory_repository::InMemoryTodoRepository;
pub use postgres_repository::PostgresTodoRepository;
pub use service::{CreateTodoRequest, TodoCachePolicy, TodoService, UpdateTodoRequest};
