//! Credential and refresh-token storage
//!
//! The session layer only talks to the traits below. `UserRepository` and
//! `RefreshTokenRepository` are the PostgreSQL implementations; other stores
//! (the API's in-memory store, for one) implement the same contracts.

use std::future::Future;

use chrono::{DateTime, Utc};
use common::DatabaseResult;
use uuid::Uuid;

use crate::models::{NewRefreshToken, NewUser, ProfileUpdate, RefreshToken, User};

pub mod refresh_token;
pub mod user;

pub use refresh_token::RefreshTokenRepository;
pub use user::UserRepository;

/// Persisted user records
pub trait CredentialStore: Clone + Send + Sync + 'static {
    /// Insert a user. A duplicate email fails with `DatabaseError::Conflict`.
    fn create_user(&self, user: NewUser) -> impl Future<Output = DatabaseResult<User>> + Send;

    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = DatabaseResult<Option<User>>> + Send;

    fn find_user_by_id(&self, id: Uuid)
    -> impl Future<Output = DatabaseResult<Option<User>>> + Send;

    /// Apply a self-service profile update, returning `None` if the user is gone.
    fn update_profile(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> impl Future<Output = DatabaseResult<Option<User>>> + Send;
}

/// Persisted refresh tokens
pub trait RefreshTokenStore: Clone + Send + Sync + 'static {
    fn insert_refresh_token(
        &self,
        token: NewRefreshToken,
    ) -> impl Future<Output = DatabaseResult<RefreshToken>> + Send;

    fn find_refresh_token(
        &self,
        token: &str,
    ) -> impl Future<Output = DatabaseResult<Option<RefreshToken>>> + Send;

    /// Atomically replace `presented` with `replacement`.
    ///
    /// Deletes the presented row, deletes any row already holding the
    /// replacement value, and inserts the replacement, as one unit. Returns
    /// `false` without writing anything when the presented row no longer
    /// exists, which is how the loser of two concurrent rotations finds out.
    fn rotate_refresh_token(
        &self,
        presented: &str,
        replacement: NewRefreshToken,
    ) -> impl Future<Output = DatabaseResult<bool>> + Send;

    /// Delete every row holding `token`; returns the number of rows removed.
    fn delete_refresh_token(&self, token: &str)
    -> impl Future<Output = DatabaseResult<u64>> + Send;

    fn count_refresh_tokens(&self, user_id: Uuid)
    -> impl Future<Output = DatabaseResult<u64>> + Send;

    /// Delete rows that expired before `now`.
    fn purge_expired_refresh_tokens(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = DatabaseResult<u64>> + Send;
}
