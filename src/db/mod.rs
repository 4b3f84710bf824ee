use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::config::DatabaseConfig;
use crate::models::ImageEntry;

pub use operations::*;
pub use pool::*;

pub mod operations;
pub mod pool;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL must be set")]
    MissingUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Image entry API error: {0}")]
    Api(String),
}

/// Where `{imageId, key}` rows end up
#[async_trait]
pub trait ImageEntryStore: Send + Sync {
    async fn insert(&self, image_id: &str, key: &str) -> Result<ImageEntry, DbError>;

    /// Whether the backing store is reachable
    async fn is_healthy(&self) -> bool;
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let url = config.url.as_deref().ok_or(DbError::MissingUrl)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect(url)
        .await?;

    // Test connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
