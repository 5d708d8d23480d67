//! PostgreSQL todo repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::todo::{NewTodo, Page, PageRequest, Priority, Todo, TodoId, TodoRepository};
use crate::domain::DomainError;

const SELECT_COLUMNS: &str = "id, title, description, completed, priority, due_date, tags, \
                              created_at, updated_at";

/// Row filter shared by the three page queries
enum PageFilter<'a> {
    All,
    Completed(bool),
    TitleContains(&'a str),
}

impl PageFilter<'_> {
    fn where_clause(&self) -> &'static str {
        match self {
            PageFilter::All => "",
            PageFilter::Completed(_) => "WHERE completed = $1",
            PageFilter::TitleContains(_) => r"WHERE title ILIKE $1 ESCAPE '\'",
        }
    }

    /// Index of the first LIMIT/OFFSET placeholder
    fn next_param(&self) -> usize {
        match self {
            PageFilter::All => 1,
            _ => 2,
        }
    }
}

/// PostgreSQL implementation of TodoRepository
#[derive(Debug, Clone)]
pub struct PostgresTodoRepository {
    pool: PgPool,
}

impl PostgresTodoRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_page(
        &self,
        filter: PageFilter<'_>,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError> {
        let where_clause = filter.where_clause();
        let pattern = match &filter {
            PageFilter::TitleContains(query) => Some(like_pattern(query)),
            _ => None,
        };

        let count_sql = format!("SELECT COUNT(*) FROM todos {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        count_query = match &filter {
            PageFilter::All => count_query,
            PageFilter::Completed(completed) => count_query.bind(*completed),
            PageFilter::TitleContains(_) => count_query.bind(pattern.clone()),
        };

        let total: i64 = count_query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to count todos: {}", e)))?;

        if total == 0 {
            return Ok(Page::empty(request));
        }

        let next = filter.next_param();
        let select_sql = format!(
            "SELECT {} FROM todos {} ORDER BY created_at DESC, id DESC LIMIT ${} OFFSET ${}",
            SELECT_COLUMNS,
            where_clause,
            next,
            next + 1
        );

        let mut select_query = sqlx::query(&select_sql);
        select_query = match &filter {
            PageFilter::All => select_query,
            PageFilter::Completed(completed) => select_query.bind(*completed),
            PageFilter::TitleContains(_) => select_query.bind(pattern),
        };

        let rows = select_query
            .bind(i64::try_from(request.limit()).unwrap_or(i64::MAX))
            .bind(i64::try_from(request.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list todos: {}", e)))?;

        let content = rows
            .iter()
            .map(row_to_todo)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(content, total as u64, request))
    }
}

#[async_trait]
impl TodoRepository for PostgresTodoRepository {
    async fn insert(&self, todo: NewTodo) -> Result<Todo, DomainError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO todos (title, description, completed, priority, due_date, tags,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.completed)
        .bind(todo.priority.as_str())
        .bind(todo.due_date)
        .bind(&todo.tags)
        .bind(todo.created_at)
        .bind(todo.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to insert todo: {}", e)))?;

        Ok(todo.into_todo(TodoId::new(id)))
    }

    async fn find_by_id(&self, id: TodoId) -> Result<Option<Todo>, DomainError> {
        let sql = format!("SELECT {} FROM todos WHERE id = $1", SELECT_COLUMNS);

        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get todo: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_todo(&row)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, todo: Todo) -> Result<Todo, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE todos
            SET title = $2, description = $3, completed = $4, priority = $5,
                due_date = $6, tags = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(todo.id().value())
        .bind(todo.title())
        .bind(todo.description())
        .bind(todo.completed())
        .bind(todo.priority().as_str())
        .bind(todo.due_date())
        .bind(todo.tags())
        .bind(todo.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to update todo: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(todo.id()));
        }

        Ok(todo)
    }

    async fn delete_by_id(&self, id: TodoId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete todo: {}", e)))?;

        Ok(())
    }

    async fn exists_by_id(&self, id: TodoId) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM todos WHERE id = $1)")
            .bind(id.value())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check todo: {}", e)))
    }

    async fn find_page(&self, request: PageRequest) -> Result<Page<Todo>, DomainError> {
        self.fetch_page(PageFilter::All, request).await
    }

    async fn find_page_by_completed(
        &self,
        completed: bool,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError> {
        self.fetch_page(PageFilter::Completed(completed), request)
            .await
    }

    async fn find_page_by_title_contains(
        &self,
        query: &str,
        request: PageRequest,
    ) -> Result<Page<Todo>, DomainError> {
        self.fetch_page(PageFilter::TitleContains(query), request)
            .await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Database unreachable: {}", e)))?;

        Ok(())
    }
}

fn row_to_todo(row: &PgRow) -> Result<Todo, DomainError> {
    let id: i64 = row.get("id");
    let priority: String = row.get("priority");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    let priority: Priority = priority
        .parse()
        .map_err(|e| DomainError::storage(format!("Invalid priority in database: {}", e)))?;

    let draft = NewTodo {
        title: row.get("title"),
        description: row.get("description"),
        completed: row.get("completed"),
        priority,
        due_date: row.get("due_date"),
        tags: row.get("tags"),
        created_at,
        updated_at,
    };

    Ok(draft.into_todo(TodoId::new(id)))
}

/// Wrap a user query in `%…%`, escaping LIKE metacharacters so it matches
/// as a literal substring
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');

    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }

    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_plain() {
        assert_eq!(like_pattern("meeting"), "%meeting%");
        assert_eq!(like_pattern(""), "%%");
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("100%"), r"%100\%%");
        assert_eq!(like_pattern("snake_case"), r"%snake\_case%");
        assert_eq!(like_pattern(r"C:\tmp"), r"%C:\\tmp%");
    }

    #[test]
    fn test_page_filter_placeholders() {
        assert_eq!(PageFilter::All.next_param(), 1);
        assert_eq!(PageFilter::Completed(true).next_param(), 2);
        assert_eq!(PageFilter::TitleContains("x").next_param(), 2);
        assert!(PageFilter::TitleContains("x").where_clause().contains("ESCAPE"));
    }

    // Live database tests:
    // DATABASE_URL=postgres://... cargo test -- --ignored

    async fn live_repository() -> PostgresTodoRepository {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        crate::infrastructure::storage::migrations::run_migrations(&pool)
            .await
            .unwrap();
        sqlx::query("TRUNCATE todos RESTART IDENTITY")
            .execute(&pool)
            .await
            .unwrap();
        PostgresTodoRepository::new(pool)
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_postgres_insert_find_delete() {
        let repo = live_repository().await;

        let created = repo
            .insert(NewTodo::new("Buy milk").with_priority(Priority::High))
            .await
            .unwrap();
        assert!(created.id().value() > 0);

        let found = repo.find_by_id(created.id()).await.unwrap().unwrap();
        assert_eq!(found, created);

        repo.delete_by_id(created.id()).await.unwrap();
        assert!(!repo.exists_by_id(created.id()).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_postgres_search_is_literal() {
        let repo = live_repository().await;

        repo.insert(NewTodo::new("100% done")).await.unwrap();
        repo.insert(NewTodo::new("1000 items")).await.unwrap();

        let page = repo
            .find_page_by_title_contains("0%", PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].title(), "100% done");
    }
}
