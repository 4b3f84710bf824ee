use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DbError, ImageEntryStore};
use crate::models::ImageEntry;

/// `image_entries` table access
#[derive(Clone)]
pub struct PgImageEntryStore {
    pool: PgPool,
}

impl PgImageEntryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageEntryStore for PgImageEntryStore {
    async fn insert(&self, image_id: &str, key: &str) -> Result<ImageEntry, DbError> {
        let entry = sqlx::query_as::<_, ImageEntry>(
            r#"
            INSERT INTO image_entries (id, image_id, key)
            VALUES ($1, $2, $3)
            RETURNING id, image_id, key, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(image_id)
        .bind(key)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(image_id, key, "Image entry saved");
        Ok(entry)
    }

    async fn is_healthy(&self) -> bool {
        super::health_check(&self.pool).await.unwrap_or(false)
    }
}
