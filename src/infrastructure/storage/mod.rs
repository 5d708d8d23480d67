//! Storage infrastructure - PostgreSQL pooling, migrations and store selection

mod factory;
pub mod migrations;
mod postgres;

pub use factory::{StorageConfig, StorageFactory, StorageType};
pub use migrations::{run_migrations, Migration, Migrator, PostgresMigrator};
pub use postgres::{connect_pool, PostgresConfig};
