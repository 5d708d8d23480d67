//! Todo endpoint handlers

use axum::{extract::State, http::StatusCode};
use tracing::debug;
use validator::Validate;

use crate::api::state::AppState;
use crate::api::types::json::validation_error;
use crate::api::types::{
    ApiError, CreateTodoDto, FilterParams, Json, PageParams, PageResponse, Path, Query,
    SearchParams, TodoResponse, UpdateTodoDto, ValidatedJson,
};
use crate::domain::todo::TodoId;

type TodoPage = Json<PageResponse<TodoResponse>>;

fn validated<T: Validate>(params: T) -> Result<T, ApiError> {
    params.validate().map_err(|e| validation_error(&e))?;
    Ok(params)
}

/// POST /api/v1/todos
pub async fn create_todo(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateTodoDto>,
) -> Result<(StatusCode, Json<TodoResponse>), ApiError> {
    let todo = state.todo_service.create(dto.into()).await?;

    debug!(id = %todo.id(), "Created todo");

    Ok((StatusCode::CREATED, Json(todo.into())))
}

/// GET /api/v1/todos/{id}
pub async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state.todo_service.get(TodoId::new(id)).await?;
    Ok(Json(todo.into()))
}

/// GET /api/v1/todos
pub async fn list_todos(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<TodoPage, ApiError> {
    let params = validated(params)?;
    debug!(page = params.page, size = params.size, "Listing todos");

    let page = state.todo_service.list(params.page_request()).await?;
    Ok(Json(PageResponse::from_page(page)))
}

/// PUT /api/v1/todos/{id}
pub async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ValidatedJson(dto): ValidatedJson<UpdateTodoDto>,
) -> Result<Json<TodoResponse>, ApiError> {
    let todo = state
        .todo_service
        .update(TodoId::new(id), dto.into())
        .await?;

    Ok(Json(todo.into()))
}

/// DELETE /api/v1/todos/{id}
pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.todo_service.delete(TodoId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/todos/filter
pub async fn filter_todos(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<TodoPage, ApiError> {
    let params = validated(params)?;
    debug!(completed = params.completed, "Filtering todos");

    let page = state
        .todo_service
        .filter_by_completed(params.completed, params.page_request())
        .await?;

    Ok(Json(PageResponse::from_page(page)))
}

/// GET /api/v1/todos/search
pub async fn search_todos(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<TodoPage, ApiError> {
    let params = validated(params)?;
    debug!(query = %params.query, "Searching todos");

    let page = state
        .todo_service
        .search_by_title(&params.query, params.page_request())
        .await?;

    Ok(Json(PageResponse::from_page(page)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::api::create_router;
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::todo::{InMemoryTodoRepository, TodoService};

    fn app() -> Router {
        let service = TodoService::new(
            Arc::new(InMemoryTodoRepository::new()),
            Arc::new(InMemoryCache::new()),
        );

        create_router(AppState::new(Arc::new(service)), None)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);

        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    async fn create(app: &Router, body: Value) -> Value {
        let (status, json) = send(app, Method::POST, "/api/v1/todos", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        json
    }

    fn titles(page: &Value) -> Vec<&str> {
        page["content"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_create_update_delete_lifecycle() {
        let app = app();

        let created = create(&app, json!({"title": "Buy milk"})).await;
        assert_eq!(created["completed"], false);
        assert_eq!(created["priority"], "MEDIUM");
        assert_eq!(created["createdAt"], created["updatedAt"]);
        let id = created["id"].as_i64().unwrap();
        let uri = format!("/api/v1/todos/{}", id);

        let (status, updated) = send(&app, Method::PUT, &uri, Some(json!({"completed": true}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["completed"], true);
        assert_eq!(updated["title"], "Buy milk");
        assert_eq!(updated["createdAt"], created["createdAt"]);
        assert_ne!(updated["updatedAt"], created["updatedAt"]);

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found_error");
        assert_eq!(body["error"]["message"], format!("Todo not found with id: {}", id));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let app = app();

        let (status, body) =
            send(&app, Method::POST, "/api/v1/todos", Some(json!({"title": "  "}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["param"], "title");
        assert_eq!(body["error"]["message"], "title: Title is required");
    }

    #[tokio::test]
    async fn test_create_rejects_missing_title_and_bad_priority() {
        let app = app();

        let (status, body) =
            send(&app, Method::POST, "/api/v1/todos", Some(json!({"completed": true}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "json_parse_error");

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/todos",
            Some(json!({"title": "x", "priority": "URGENT"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let app = app();

        let (status, _) =
            send(&app, Method::PUT, "/api/v1/todos/99", Some(json!({"title": "x"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, "/api/v1/todos/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_rejects_blank_title() {
        let app = app();
        let created = create(&app, json!({"title": "Keep me"})).await;
        let uri = format!("/api/v1/todos/{}", created["id"]);

        let (status, _) = send(&app, Method::PUT, &uri, Some(json!({"title": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, current) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(current["title"], "Keep me");
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_bad_request() {
        let (status, body) = send(&app(), Method::GET, "/api/v1/todos/abc", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["param"], "id");
    }

    #[tokio::test]
    async fn test_list_is_newest_first_with_envelope() {
        let app = app();
        for title in ["first", "second", "third"] {
            create(&app, json!({"title": title})).await;
        }

        let (status, page) = send(&app, Method::GET, "/api/v1/todos?page=0&size=2", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&page), vec!["third", "second"]);
        assert_eq!(page["totalElements"], 3);
        assert_eq!(page["totalPages"], 2);
        assert_eq!(page["first"], true);
        assert_eq!(page["last"], false);

        let (_, page) = send(&app, Method::GET, "/api/v1/todos?page=1&size=2", None).await;
        assert_eq!(titles(&page), vec!["first"]);
        assert_eq!(page["last"], true);
    }

    #[tokio::test]
    async fn test_list_defaults() {
        let (status, page) = send(&app(), Method::GET, "/api/v1/todos", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["page"], 0);
        assert_eq!(page["size"], 20);
        assert_eq!(page["empty"], true);
    }

    #[tokio::test]
    async fn test_page_size_bounds() {
        let app = app();

        for uri in [
            "/api/v1/todos?size=0",
            "/api/v1/todos?size=1001",
            "/api/v1/todos/filter?completed=true&size=0",
        ] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"]["param"], "size");
        }

        let (status, _) = send(&app, Method::GET, "/api/v1/todos?page=-1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_filter_by_completed() {
        let app = app();
        create(&app, json!({"title": "done", "completed": true})).await;
        create(&app, json!({"title": "open"})).await;

        let (_, page) = send(&app, Method::GET, "/api/v1/todos/filter?completed=true", None).await;
        assert_eq!(titles(&page), vec!["done"]);

        let (_, page) = send(&app, Method::GET, "/api/v1/todos/filter?completed=false", None).await;
        assert_eq!(titles(&page), vec!["open"]);

        let (status, _) = send(&app, Method::GET, "/api/v1/todos/filter", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_filter_pages_are_newest_first() {
        let app = app();
        for (title, completed) in [("a", true), ("b", false), ("c", true), ("d", true)] {
            create(&app, json!({"title": title, "completed": completed})).await;
        }

        let (status, page) =
            send(&app, Method::GET, "/api/v1/todos/filter?completed=true&page=0&size=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&page), vec!["d", "c"]);
        assert_eq!(page["totalElements"], 3);
        assert_eq!(page["last"], false);

        let (_, page) =
            send(&app, Method::GET, "/api/v1/todos/filter?completed=true&page=1&size=2", None).await;
        assert_eq!(titles(&page), vec!["a"]);
        assert_eq!(page["last"], true);
    }

    #[tokio::test]
    async fn test_search_by_title() {
        let app = app();
        for title in ["Team Meeting", "meeting notes", "Project Update"] {
            create(&app, json!({"title": title})).await;
        }

        let (status, page) =
            send(&app, Method::GET, "/api/v1/todos/search?query=meeting", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&page), vec!["meeting notes", "Team Meeting"]);

        let (status, _) = send(&app, Method::GET, "/api/v1/todos/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_responses_carry_request_id_and_security_headers() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/todos")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-42");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }
}
