//! Database migrations infrastructure

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// Trait for running database migrations
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Runs all pending migrations, returning how many were applied
    async fn run(&self) -> Result<usize, DomainError>;

    /// Returns the current migration version
    async fn version(&self) -> Result<Option<i64>, DomainError>;
}

/// PostgreSQL migrator applying the embedded migrations in version order.
/// Applied versions are tracked in `_migrations`.
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
    migrations: Vec<Migration>,
}

impl PostgresMigrator {
    pub fn new(pool: PgPool) -> Self {
        Self::with_migrations(pool, todo_migrations())
    }

    pub fn with_migrations(pool: PgPool, mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by_key(|m| m.version);
        Self { pool, migrations }
    }

    /// Creates the migrations table if it doesn't exist
    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                success BOOLEAN NOT NULL DEFAULT TRUE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    /// Applies a single migration unless it is already recorded. Returns
    /// whether it ran.
    async fn apply(&self, migration: &Migration) -> Result<bool, DomainError> {
        let applied: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)",
        )
        .bind(migration.version)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))?;

        if applied {
            return Ok(false);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to begin migration: {}", e)))?;

        for &statement in migration.up {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    DomainError::storage(format!(
                        "Failed to run migration {}: {}",
                        migration.version, e
                    ))
                })?;
        }

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to commit migration {}: {}",
                migration.version, e
            ))
        })?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );

        Ok(true)
    }
}

#[async_trait]
impl Migrator for PostgresMigrator {
    async fn run(&self) -> Result<usize, DomainError> {
        self.ensure_migrations_table().await?;

        let mut applied = 0;
        for migration in &self.migrations {
            if self.apply(migration).await? {
                applied += 1;
            }
        }

        Ok(applied)
    }

    async fn version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations WHERE success = TRUE")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// An embedded schema migration
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    /// Statements applied in order within one transaction, one statement each
    pub up: &'static [&'static str],
}

impl Migration {
    pub const fn new(
        version: i64,
        description: &'static str,
        up: &'static [&'static str],
    ) -> Self {
        Self {
            version,
            description,
            up,
        }
    }
}

/// Schema history of the todos table
pub fn todo_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create todos table",
            &[r#"
            CREATE TABLE IF NOT EXISTS todos (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                completed BOOLEAN NOT NULL DEFAULT FALSE,
                priority VARCHAR(10) NOT NULL DEFAULT 'MEDIUM',
                due_date TIMESTAMPTZ,
                tags TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#],
        ),
        Migration::new(
            2,
            "Index todos for ordered paging and completion filter",
            &[
                "CREATE INDEX IF NOT EXISTS idx_todos_created_at ON todos(created_at DESC, id DESC)",
                "CREATE INDEX IF NOT EXISTS idx_todos_completed ON todos(completed, created_at DESC)",
            ],
        ),
        Migration::new(
            3,
            "Restrict priority values",
            &[
                "ALTER TABLE todos DROP CONSTRAINT IF EXISTS chk_todos_priority",
                r#"
                ALTER TABLE todos ADD CONSTRAINT chk_todos_priority
                    CHECK (priority IN ('LOW', 'MEDIUM', 'HIGH'))
                "#,
            ],
        ),
    ]
}

/// Runs all pending migrations against the pool
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DomainError> {
    PostgresMigrator::new(pool.clone()).run().await
}
