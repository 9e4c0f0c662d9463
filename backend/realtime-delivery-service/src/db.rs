use crate::config::Config;
use crate::error::AppResult;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Connect, verify the connection and apply pending migrations.
pub async fn init_pool(config: &Config) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!(
        max_connections = config.database_max_connections,
        "database pool ready"
    );

    MIGRATOR.run(&pool).await?;
    Ok(pool)
}
