use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::{Profile, UserId};

/// Read-only view of the user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, user_id: UserId) -> Result<bool, StoreError>;

    /// Unknown users are not premium.
    async fn is_premium(&self, user_id: UserId) -> Result<bool, StoreError>;

    /// Up to `limit` profiles whose id is not in `exclude`, in random order.
    async fn fetch_random(&self, exclude: &[UserId], limit: usize) -> Result<Vec<Profile>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn exists(&self, user_id: UserId) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)"
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn is_premium(&self, user_id: UserId) -> Result<bool, StoreError> {
        let premium = sqlx::query_scalar::<_, bool>(
            "SELECT is_premium FROM users WHERE id = $1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(premium.unwrap_or(false))
    }

    async fn fetch_random(&self, exclude: &[UserId], limit: usize) -> Result<Vec<Profile>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, name, username
            FROM users
            WHERE NOT (id = ANY($1))
            ORDER BY RANDOM()
            LIMIT $2
            "#
        )
        .bind(exclude)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }
}
