use anyhow::Result;
use sqlx::PgPool;

/// Applies the `users` and `swipes` schema.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("database schema is up to date");
    Ok(())
}
