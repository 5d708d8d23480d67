//! Cache domain - Generic caching abstraction layer

mod key;
mod repository;

pub use key::{CacheKeyParams, TodoCacheKeys, TODO_NAMESPACE};
pub use repository::{Cache, CacheExt};
pub(crate) use repository::pattern_to_regex;

#[cfg(test)]
pub use repository::mock::MockCache;
