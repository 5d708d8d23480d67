//! Request and response types for the HTTP API

pub mod error;
pub mod extract;
pub mod json;
pub mod todo;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use extract::{Path, Query};
pub use json::{Json, ValidatedJson};
pub use todo::{
    CreateTodoDto, FilterParams, PageParams, PageResponse, SearchParams, TodoResponse,
    UpdateTodoDto,
};
