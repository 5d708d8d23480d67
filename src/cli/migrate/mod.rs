//! Migrate command - applies pending schema migrations and exits

use anyhow::Context;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::storage::{connect_pool, Migrator, PostgresMigrator};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config.logging);

    let pool = connect_pool(&config.postgres_config()?).await?;
    let migrator = PostgresMigrator::new(pool.clone());

    let applied = migrator.run().await?;
    let version = migrator.version().await?;

    info!(applied, version = ?version, "Database is up to date");

    pool.close().await;

    Ok(())
}
