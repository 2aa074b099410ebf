//! User repository for database operations

use chrono::Utc;
use common::DatabaseResult;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::CredentialStore;
use crate::models::{NewUser, ProfileUpdate, User};

/// Column list matching [`User`]'s `FromRow` layout
pub const USER_COLUMNS: &str = "id, email, password_hash, name, role, company, resume_url, \
                                is_active, is_admin, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CredentialStore for UserRepository {
    async fn create_user(&self, new_user: NewUser) -> DatabaseResult<User> {
        info!("Creating new {} account", new_user.role);

        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, role, company, is_active, is_admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, FALSE, $7, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.name)
        .bind(new_user.role)
        .bind(&new_user.company)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> DatabaseResult<Option<User>> {
        let (set_resume, resume_url) = match update.resume_url {
            Some(value) => (true, value),
            None => (false, None),
        };

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                resume_url = CASE WHEN $3 THEN $4 ELSE resume_url END,
                updated_at = $5
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name)
        .bind(set_resume)
        .bind(resume_url)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
