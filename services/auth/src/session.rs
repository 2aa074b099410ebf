//! Session lifecycle: signup, login, refresh rotation, logout
//!
//! A session is nothing more than a refresh-token row. Access tokens are
//! never stored, so logging out only revokes the ability to mint new ones.

use chrono::{DateTime, Utc};
use common::DatabaseError;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::jwt::{TokenError, TokenService};
use crate::models::{
    LoginCredentials, NewAccount, NewRefreshToken, NewUser, ProfileUpdate, User, UserProfile,
};
use crate::password::{self, PasswordError};
use crate::repositories::{CredentialStore, RefreshTokenStore};
use crate::validation;

/// Session lifecycle errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("An account with this email already exists")]
    Conflict,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account is disabled")]
    AccountDisabled,
    #[error("Refresh token missing")]
    MissingRefreshToken,
    #[error("Invalid or expired refresh token")]
    InvalidOrExpiredToken,
    #[error("User not found")]
    NotFound,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Everything a client receives when a session starts or rotates
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Session manager
#[derive(Clone)]
pub struct SessionManager<S> {
    store: S,
    tokens: TokenService,
}

impl<S> SessionManager<S>
where
    S: CredentialStore + RefreshTokenStore,
{
    /// Create a new session manager
    pub fn new(store: S, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register an account and open its first session
    pub async fn signup(&self, account: NewAccount) -> SessionResult<IssuedSession> {
        validation::validate_new_account(&account).map_err(SessionError::InvalidInput)?;

        let email = validation::normalize_email(&account.email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(SessionError::Conflict);
        }

        let password_hash = password::hash_password(&account.password).await?;
        let new_user = NewUser {
            email,
            password_hash,
            name: account.name.trim().to_string(),
            role: account.role,
            company: account.company.map(|company| company.trim().to_string()),
        };

        // Two signups racing on the same email both pass the lookup above;
        // the unique index settles it.
        let user = self.store.create_user(new_user).await.map_err(|e| match e {
            DatabaseError::Conflict(_) => SessionError::Conflict,
            other => SessionError::Database(other),
        })?;

        info!("User {} signed up as {}", user.id, user.role);
        self.open_session(&user).await
    }

    /// Authenticate with email and password
    pub async fn login(&self, credentials: LoginCredentials) -> SessionResult<IssuedSession> {
        let email = validation::normalize_email(&credentials.email);

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            password::verify_dummy(&credentials.password).await?;
            warn!("Login rejected: unknown account");
            return Err(SessionError::InvalidCredentials);
        };

        if !password::verify_password(&credentials.password, &user.password_hash).await? {
            warn!("Login rejected for user {}: wrong password", user.id);
            return Err(SessionError::InvalidCredentials);
        }

        if !user.is_active {
            warn!("Login rejected for user {}: account disabled", user.id);
            return Err(SessionError::AccountDisabled);
        }

        info!("User {} logged in", user.id);
        self.open_session(&user).await
    }

    /// Rotate a refresh token into a fresh access/refresh pair
    pub async fn refresh(&self, presented: Option<&str>) -> SessionResult<IssuedSession> {
        let presented = presented
            .filter(|token| !token.is_empty())
            .ok_or(SessionError::MissingRefreshToken)?;

        let claims = self
            .tokens
            .verify_refresh_token(presented)
            .map_err(|_| SessionError::InvalidOrExpiredToken)?;

        let stored = self
            .store
            .find_refresh_token(presented)
            .await?
            .ok_or(SessionError::InvalidOrExpiredToken)?;

        if stored.is_expired(Utc::now()) || stored.user_id != claims.sub {
            self.store.delete_refresh_token(presented).await?;
            return Err(SessionError::InvalidOrExpiredToken);
        }

        let user = self
            .store
            .find_user_by_id(stored.user_id)
            .await?
            .ok_or(SessionError::InvalidOrExpiredToken)?;

        if !user.is_active {
            self.store.delete_refresh_token(presented).await?;
            warn!("Refresh rejected for user {}: account disabled", user.id);
            return Err(SessionError::AccountDisabled);
        }

        let access = self
            .tokens
            .issue_access_token(user.id, user.role, user.is_admin)?;
        let refresh = self.tokens.issue_refresh_token(user.id)?;

        let replacement = NewRefreshToken {
            user_id: user.id,
            token: refresh.token.clone(),
            expires_at: refresh.expires_at,
        };

        if !self.store.rotate_refresh_token(presented, replacement).await? {
            // Lost a race against another rotation of the same token.
            warn!("Refresh rejected for user {}: token already rotated", user.id);
            return Err(SessionError::InvalidOrExpiredToken);
        }

        info!("Rotated refresh token for user {}", user.id);
        Ok(IssuedSession {
            user: UserProfile::from(&user),
            access_token: access.token,
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
        })
    }

    /// Revoke a refresh token. Missing or unknown tokens are not an error.
    pub async fn logout(&self, presented: Option<&str>) -> SessionResult<()> {
        if let Some(token) = presented.filter(|token| !token.is_empty()) {
            let removed = self.store.delete_refresh_token(token).await?;
            info!("Logout removed {} refresh token(s)", removed);
        }
        Ok(())
    }

    /// Current profile of an authenticated user
    pub async fn me(&self, user_id: Uuid) -> SessionResult<UserProfile> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .map(|user| UserProfile::from(&user))
            .ok_or(SessionError::NotFound)
    }

    /// Apply a self-service profile update
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        mut update: ProfileUpdate,
    ) -> SessionResult<UserProfile> {
        validation::validate_profile_update(&update).map_err(SessionError::InvalidInput)?;
        update.name = update.name.map(|name| name.trim().to_string());

        let user = self
            .store
            .update_profile(user_id, update)
            .await?
            .ok_or(SessionError::NotFound)?;

        info!("User {} updated their profile", user.id);
        Ok(UserProfile::from(&user))
    }

    /// Delete refresh-token rows whose expiry has passed
    pub async fn cleanup_expired_sessions(&self) -> SessionResult<u64> {
        let purged = self.store.purge_expired_refresh_tokens(Utc::now()).await?;
        Ok(purged)
    }

    async fn open_session(&self, user: &User) -> SessionResult<IssuedSession> {
        let access = self
            .tokens
            .issue_access_token(user.id, user.role, user.is_admin)?;
        let refresh = self.tokens.issue_refresh_token(user.id)?;

        self.store
            .insert_refresh_token(NewRefreshToken {
                user_id: user.id,
                token: refresh.token.clone(),
                expires_at: refresh.expires_at,
            })
            .await?;

        Ok(IssuedSession {
            user: UserProfile::from(user),
            access_token: access.token,
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtConfig;
    use crate::models::{RefreshToken, Role};
    use common::DatabaseResult;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct State {
        users: Vec<User>,
        tokens: Vec<RefreshToken>,
    }

    #[derive(Clone, Default)]
    struct FakeStore {
        state: Arc<Mutex<State>>,
    }

    impl CredentialStore for FakeStore {
        async fn create_user(&self, user: NewUser) -> DatabaseResult<User> {
            let mut state = self.state.lock().await;
            if state.users.iter().any(|u| u.email == user.email) {
                return Err(DatabaseError::Conflict("users_email_key".to_string()));
            }
            let now = Utc::now();
            let user = User {
                id: Uuid::new_v4(),
                email: user.email,
                password_hash: user.password_hash,
                name: user.name,
                role: user.role,
                company: user.company,
                resume_url: None,
                is_active: true,
                is_admin: false,
                created_at: now,
                updated_at: now,
            };
            state.users.push(user.clone());
            Ok(user)
        }

        async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
            let state = self.state.lock().await;
            Ok(state.users.iter().find(|u| u.email == email).cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
            let state = self.state.lock().await;
            Ok(state.users.iter().find(|u| u.id == id).cloned())
        }

        async fn update_profile(
            &self,
            id: Uuid,
            update: ProfileUpdate,
        ) -> DatabaseResult<Option<User>> {
            let mut state = self.state.lock().await;
            let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
                return Ok(None);
            };
            if let Some(name) = update.name {
                user.name = name;
            }
            if let Some(resume_url) = update.resume_url {
                user.resume_url = resume_url;
            }
            Ok(Some(user.clone()))
        }
    }

    impl RefreshTokenStore for FakeStore {
        async fn insert_refresh_token(&self, token: NewRefreshToken) -> DatabaseResult<RefreshToken> {
            let row = RefreshToken {
                id: Uuid::new_v4(),
                user_id: token.user_id,
                token: token.token,
                expires_at: token.expires_at,
                created_at: Utc::now(),
            };
            self.state.lock().await.tokens.push(row.clone());
            Ok(row)
        }

        async fn find_refresh_token(&self, token: &str) -> DatabaseResult<Option<RefreshToken>> {
            let state = self.state.lock().await;
            Ok(state.tokens.iter().find(|t| t.token == token).cloned())
        }

        async fn rotate_refresh_token(
            &self,
            presented: &str,
            replacement: NewRefreshToken,
        ) -> DatabaseResult<bool> {
            let mut state = self.state.lock().await;
            let before = state.tokens.len();
            state.tokens.retain(|t| t.token != presented);
            if state.tokens.len() == before {
                return Ok(false);
            }
            state.tokens.retain(|t| t.token != replacement.token);
            state.tokens.push(RefreshToken {
                id: Uuid::new_v4(),
                user_id: replacement.user_id,
                token: replacement.token,
                expires_at: replacement.expires_at,
                created_at: Utc::now(),
            });
            Ok(true)
        }

        async fn delete_refresh_token(&self, token: &str) -> DatabaseResult<u64> {
            let mut state = self.state.lock().await;
            let before = state.tokens.len();
            state.tokens.retain(|t| t.token != token);
            Ok((before - state.tokens.len()) as u64)
        }

        async fn count_refresh_tokens(&self, user_id: Uuid) -> DatabaseResult<u64> {
            let state = self.state.lock().await;
            Ok(state.tokens.iter().filter(|t| t.user_id == user_id).count() as u64)
        }

        async fn purge_expired_refresh_tokens(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
            let mut state = self.state.lock().await;
            let before = state.tokens.len();
            state.tokens.retain(|t| !t.is_expired(now));
            Ok((before - state.tokens.len()) as u64)
        }
    }

    fn manager() -> (SessionManager<FakeStore>, FakeStore) {
        let store = FakeStore::default();
        let tokens = TokenService::new(JwtConfig {
            access_secret: "access".to_string(),
            refresh_secret: "refresh".to_string(),
            access_token_expiry: Duration::from_secs(900),
            refresh_token_expiry: Duration::from_secs(7 * 86_400),
        });
        (SessionManager::new(store.clone(), tokens), store)
    }

    fn applicant() -> NewAccount {
        NewAccount {
            email: "John.Doe@email.com".to_string(),
            password: "Password1".to_string(),
            name: "John Doe".to_string(),
            role: Role::Applicant,
            company: None,
        }
    }

    fn credentials(email: &str, password: &str) -> LoginCredentials {
        LoginCredentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn signup_opens_a_session() {
        let (sessions, store) = manager();

        let session = sessions.signup(applicant()).await.unwrap();

        assert_eq!(session.user.email, "john.doe@email.com");
        assert_eq!(store.count_refresh_tokens(session.user.id).await.unwrap(), 1);
        let claims = sessions
            .tokens()
            .verify_access_token(&session.access_token)
            .unwrap();
        assert_eq!(claims.sub, session.user.id);
        assert_eq!(claims.role, Role::Applicant);
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email_and_bad_role_company() {
        let (sessions, _) = manager();
        sessions.signup(applicant()).await.unwrap();

        let mut duplicate = applicant();
        duplicate.email = "JOHN.DOE@EMAIL.COM".to_string();
        assert!(matches!(
            sessions.signup(duplicate).await,
            Err(SessionError::Conflict)
        ));

        let mut recruiter = applicant();
        recruiter.email = "recruiter@meta.com".to_string();
        recruiter.role = Role::Recruiter;
        assert!(matches!(
            sessions.signup(recruiter).await,
            Err(SessionError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (sessions, _) = manager();
        sessions.signup(applicant()).await.unwrap();

        let wrong_password = sessions
            .login(credentials("john.doe@email.com", "Password2"))
            .await
            .unwrap_err();
        let unknown = sessions
            .login(credentials("nobody@email.com", "Password1"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, SessionError::InvalidCredentials));
        assert!(matches!(unknown, SessionError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn disabled_account_is_only_revealed_with_the_right_password() {
        let (sessions, store) = manager();
        let session = sessions.signup(applicant()).await.unwrap();
        store.state.lock().await.users[0].is_active = false;

        assert!(matches!(
            sessions
                .login(credentials("john.doe@email.com", "Password2"))
                .await,
            Err(SessionError::InvalidCredentials)
        ));
        assert!(matches!(
            sessions
                .login(credentials("john.doe@email.com", "Password1"))
                .await,
            Err(SessionError::AccountDisabled)
        ));
        assert!(matches!(
            sessions.refresh(Some(&session.refresh_token)).await,
            Err(SessionError::AccountDisabled)
        ));
    }

    #[tokio::test]
    async fn refresh_rotates_exactly_once() {
        let (sessions, store) = manager();
        let first = sessions.signup(applicant()).await.unwrap();

        let second = sessions.refresh(Some(&first.refresh_token)).await.unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
        assert_eq!(store.count_refresh_tokens(first.user.id).await.unwrap(), 1);
        assert!(matches!(
            sessions.refresh(Some(&first.refresh_token)).await,
            Err(SessionError::InvalidOrExpiredToken)
        ));
        assert!(sessions.refresh(Some(&second.refresh_token)).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_refresh_has_one_winner() {
        let (sessions, store) = manager();
        let session = sessions.signup(applicant()).await.unwrap();

        let (a, b) = tokio::join!(
            sessions.refresh(Some(&session.refresh_token)),
            sessions.refresh(Some(&session.refresh_token)),
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(SessionError::InvalidOrExpiredToken)));
        assert_eq!(store.count_refresh_tokens(session.user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn refresh_rejects_missing_garbage_and_expired_tokens() {
        let (sessions, store) = manager();
        let session = sessions.signup(applicant()).await.unwrap();

        assert!(matches!(
            sessions.refresh(None).await,
            Err(SessionError::MissingRefreshToken)
        ));
        assert!(matches!(
            sessions.refresh(Some("garbage")).await,
            Err(SessionError::InvalidOrExpiredToken)
        ));

        store.state.lock().await.tokens[0].expires_at = Utc::now() - chrono::Duration::minutes(1);
        assert!(matches!(
            sessions.refresh(Some(&session.refresh_token)).await,
            Err(SessionError::InvalidOrExpiredToken)
        ));
        assert_eq!(store.count_refresh_tokens(session.user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let (sessions, store) = manager();
        let session = sessions.signup(applicant()).await.unwrap();

        sessions.logout(Some(&session.refresh_token)).await.unwrap();
        sessions.logout(Some(&session.refresh_token)).await.unwrap();
        sessions.logout(None).await.unwrap();

        assert_eq!(store.count_refresh_tokens(session.user.id).await.unwrap(), 0);
        assert!(sessions.refresh(Some(&session.refresh_token)).await.is_err());
    }

    #[tokio::test]
    async fn profile_update_and_me() {
        let (sessions, _) = manager();
        let session = sessions.signup(applicant()).await.unwrap();

        let updated = sessions
            .update_profile(
                session.user.id,
                ProfileUpdate {
                    name: Some("  Johnny Doe ".to_string()),
                    resume_url: Some(Some("uploads/resume.pdf".to_string())),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Johnny Doe");
        assert_eq!(updated.resume_url.as_deref(), Some("uploads/resume.pdf"));

        let me = sessions.me(session.user.id).await.unwrap();
        assert_eq!(me, updated);
        assert!(matches!(
            sessions.me(Uuid::new_v4()).await,
            Err(SessionError::NotFound)
        ));
    }

    #[tokio::test]
    async fn cleanup_purges_only_expired_rows() {
        let (sessions, store) = manager();
        let session = sessions.signup(applicant()).await.unwrap();
        sessions
            .login(credentials("john.doe@email.com", "Password1"))
            .await
            .unwrap();
        store.state.lock().await.tokens[0].expires_at = Utc::now() - chrono::Duration::hours(1);

        assert_eq!(sessions.cleanup_expired_sessions().await.unwrap(), 1);
        assert_eq!(store.count_refresh_tokens(session.user.id).await.unwrap(), 1);
    }
}
