//! Todo domain module
//!
//! A todo is the only entity in the system. Ids are assigned by the store,
//! `created_at` is fixed at creation and `updated_at` advances on every write.

mod entity;
mod page;
mod repository;

pub use entity::{timestamp_now, NewTodo, Priority, Todo, TodoId};
pub use page::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use repository::TodoRepository;

#[cfg(test)]
pub use repository::MockTodoRepository;
