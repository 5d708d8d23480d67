//! Domain layer - entities, store and cache contracts

pub mod cache;
pub mod error;
pub mod todo;

pub use cache::{Cache, CacheExt};
pub use error::DomainError;
pub use todo::{Page, PageRequest, Priority, Todo, TodoId, TodoRepository};
