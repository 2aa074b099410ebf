//! Refresh token repository for database operations

use chrono::{DateTime, Utc};
use common::DatabaseResult;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::RefreshTokenStore;
use crate::models::{NewRefreshToken, RefreshToken};

const TOKEN_COLUMNS: &str = "id, user_id, token, expires_at, created_at";

/// Refresh token repository
#[derive(Clone)]
pub struct RefreshTokenRepository {
    pool: PgPool,
}

impl RefreshTokenRepository {
    /// Create a new refresh token repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RefreshTokenStore for RefreshTokenRepository {
    async fn insert_refresh_token(&self, token: NewRefreshToken) -> DatabaseResult<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshToken>(&format!(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TOKEN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_refresh_token(&self, token: &str) -> DatabaseResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn rotate_refresh_token(
        &self,
        presented: &str,
        replacement: NewRefreshToken,
    ) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken by this DELETE serialises concurrent rotations of
        // the same token: the second one sees zero rows once the first commits.
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(presented)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(&replacement.token)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(replacement.user_id)
        .bind(&replacement.token)
        .bind(replacement.expires_at)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn delete_refresh_token(&self, token: &str) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_refresh_tokens(&self, user_id: Uuid) -> DatabaseResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        info!("Purged {} expired refresh tokens", result.rows_affected());
        Ok(result.rows_affected())
    }
}
