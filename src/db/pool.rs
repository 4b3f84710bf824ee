use sqlx::postgres::PgPool;

pub async fn health_check(pool: &PgPool) -> Result<bool, super::DbError> {
    if pool.is_closed() {
        return Ok(false);
    }

    sqlx::query("SELECT 1").fetch_one(pool).await?;

    Ok(true)
}
