//! Infrastructure layer - store, cache and observability implementations

pub mod cache;
pub mod logging;
pub mod observability;
pub mod storage;
pub mod todo;
