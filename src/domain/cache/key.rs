//! Cache key layout for the todo namespace
//!
//! Every key this service writes lives under `todos:`, so a single
//! `todos:*` pattern delete evicts items and cached pages alike.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::domain::todo::{PageRequest, TodoId};

/// Namespace shared by all todo cache entries
pub const TODO_NAMESPACE: &str = "todos";

/// Parameters for cache key generation
#[derive(Debug, Clone, Default)]
pub struct CacheKeyParams {
    /// Primary identifier (e.g. `item`, `list`)
    pub primary: String,
    /// Secondary components (sorted for consistency)
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            components: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    fn with_page(self, request: PageRequest) -> Self {
        self.with_component("page", request.page.to_string())
            .with_component("size", request.size.to_string())
    }

    /// Render as `namespace:primary:k1=v1:k2=v2`
    pub fn render(&self, namespace: &str) -> String {
        let mut parts = vec![namespace.to_string(), self.primary.clone()];

        for (k, v) in &self.components {
            parts.push(format!("{}={}", k, v));
        }

        parts.join(":")
    }
}

/// Key builders for todo cache entries
#[derive(Debug, Clone, Copy, Default)]
pub struct TodoCacheKeys;

impl TodoCacheKeys {
    /// Key for a single todo
    pub fn item(id: TodoId) -> String {
        format!("{}:item:{}", TODO_NAMESPACE, id)
    }

    /// Key for a page of all todos
    pub fn list(request: PageRequest) -> String {
        CacheKeyParams::new("list")
            .with_page(request)
            .render(TODO_NAMESPACE)
    }

    /// Key for a page filtered by completion flag
    pub fn filter(completed: bool, request: PageRequest) -> String {
        CacheKeyParams::new("filter")
            .with_component("completed", completed.to_string())
            .with_page(request)
            .render(TODO_NAMESPACE)
    }

    /// Key for a page of title search results. The query is digested so that
    /// user input never reaches the key verbatim (it could contain `:` or `*`).
    pub fn search(query: &str, request: PageRequest) -> String {
        CacheKeyParams::new("search")
            .with_component("q", query_digest(query))
            .with_page(request)
            .render(TODO_NAMESPACE)
    }

    /// Pattern matching every todo entry
    pub fn namespace_pattern() -> String {
        format!("{}:*", TODO_NAMESPACE)
    }
}

/// SHA-256 of the lowercased query, hex encoded. Stable across builds and
/// processes, so instances sharing a Redis agree on search keys.
fn query_digest(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}
