//! Wire types for the todo endpoints

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::todo::{Page, PageRequest, Priority, Todo, DEFAULT_PAGE_SIZE};
use crate::infrastructure::todo::{CreateTodoRequest, UpdateTodoRequest};

/// Body of `POST /api/v1/todos`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoDto {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<String>,
}

impl From<CreateTodoDto> for CreateTodoRequest {
    fn from(dto: CreateTodoDto) -> Self {
        Self {
            title: dto.title,
            description: dto.description,
            completed: dto.completed,
            priority: dto.priority,
            due_date: dto.due_date,
            tags: dto.tags,
        }
    }
}

/// Body of `PUT /api/v1/todos/{id}`. Absent or null fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoDto {
    #[validate(custom(function = "not_blank"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<String>,
}

impl From<UpdateTodoDto> for UpdateTodoRequest {
    fn from(dto: UpdateTodoDto) -> Self {
        Self {
            title: dto.title,
            description: dto.description,
            completed: dto.completed,
            priority: dto.priority,
            due_date: dto.due_date,
            tags: dto.tags,
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("Title is required".into());
        return Err(error);
    }

    Ok(())
}

/// Accepts RFC 3339 (`2025-12-31T23:59:59Z`) or an offset-less local form
/// (`2025-12-31T23:59:59`), the latter read as UTC
fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    raw.map(|s| parse_due_date(&s).map_err(serde::de::Error::custom))
        .transpose()
}

fn parse_due_date(s: &str) -> Result<DateTime<Utc>, String> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc()))
        .map_err(|_| format!("invalid dueDate '{}': expected an ISO-8601 date-time", s))?;

    Ok(parsed.trunc_subsecs(6))
}

/// Todo as returned by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id().value(),
            title: todo.title().to_string(),
            description: todo.description().map(str::to_string),
            completed: todo.completed(),
            priority: todo.priority(),
            due_date: todo.due_date(),
            tags: todo.tags().map(str::to_string),
            created_at: todo.created_at(),
            updated_at: todo.updated_at(),
        }
    }
}

/// Page envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u64,
    pub page: u32,
    pub size: u32,
    pub number_of_elements: usize,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
}

impl<T> PageResponse<T> {
    pub fn from_page<U: Into<T>>(page: Page<U>) -> Self {
        let total_pages = page.total_pages();
        let first = page.is_first();
        let last = page.is_last();
        let page = page.map(Into::into);
        let number_of_elements = page.content.len();

        Self {
            total_elements: page.total_elements,
            total_pages,
            page: page.page,
            size: page.size,
            number_of_elements,
            first,
            last,
            empty: number_of_elements == 0,
            content: page.content,
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// `?page&size` for `GET /api/v1/todos`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PageParams {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 1000, message = "size must be between 1 and 1000"))]
    pub size: u32,
}

impl PageParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

/// `?completed&page&size` for `GET /api/v1/todos/filter`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FilterParams {
    pub completed: bool,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 1000, message = "size must be between 1 and 1000"))]
    pub size: u32,
}

impl FilterParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

/// `?query&page&size` for `GET /api/v1/todos/search`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 1000, message = "size must be between 1 and 1000"))]
    pub size: u32,
}

impl SearchParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}
