//! Authentication core for ApplyTrack
//!
//! Credential and refresh-token storage contracts, token signing, password
//! hashing, input validation, rate limiting and the session lifecycle that
//! ties them together. Transport concerns live in the `api` crate.
//!
//! ```rust,no_run
//! use auth::jwt::{JwtConfig, TokenService};
//! use auth::repositories::UserRepository;
//!
//! # async fn run(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = TokenService::new(JwtConfig::from_env()?);
//! let users = UserRepository::new(pool);
//! # let _ = (tokens, users);
//! # Ok(())
//! # }
//! ```

pub mod jwt;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod session;
pub mod validation;

pub use jwt::{Claims, JwtConfig, TokenError, TokenService};
pub use rate_limiter::{RateLimitDecision, RateLimiter, RateLimiterConfig};
pub use repositories::{CredentialStore, RefreshTokenStore};
pub use session::{IssuedSession, SessionError, SessionManager};
