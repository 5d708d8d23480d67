//! Version 1 of the todo API

pub mod todos;

use axum::{routing::get, Router};

use super::state::AppState;

/// Create the `/api/v1` router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/todos", get(todos::list_todos).post(todos::create_todo))
        .route("/todos/filter", get(todos::filter_todos))
        .route("/todos/search", get(todos::search_todos))
        .route(
            "/todos/{id}",
            get(todos::get_todo)
                .put(todos::update_todo)
                .delete(todos::delete_todo),
        )
}
