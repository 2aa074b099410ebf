//! JWT service for token generation and validation
//!
//! Access tokens are short-lived and never persisted; refresh tokens are
//! long-lived and their rows are kept by a `RefreshTokenStore`. The two kinds
//! are signed with separate HS256 secrets, so one can never be replayed as
//! the other.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Role;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret for signing access tokens
    pub access_secret: String,
    /// Secret for signing refresh tokens
    pub refresh_secret: String,
    /// Access token lifetime (default: 15 minutes)
    pub access_token_expiry: Duration,
    /// Refresh token lifetime (default: 7 days)
    pub refresh_token_expiry: Duration,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_ACCESS_SECRET`: Secret for access tokens (required)
    /// - `JWT_REFRESH_SECRET`: Secret for refresh tokens (required, must differ)
    /// - `JWT_ACCESS_EXPIRES_IN`: Access token lifetime, e.g. `900`, `15m` (default: `15m`)
    /// - `JWT_REFRESH_EXPIRES_IN`: Refresh token lifetime (default: `7d`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_secret = required_var("JWT_ACCESS_SECRET")?;
        let refresh_secret = required_var("JWT_REFRESH_SECRET")?;

        if access_secret == refresh_secret {
            return Err(ConfigError::Invalid(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ".to_string(),
            ));
        }

        let access_token_expiry = duration_var("JWT_ACCESS_EXPIRES_IN", "15m")?;
        let refresh_token_expiry = duration_var("JWT_REFRESH_EXPIRES_IN", "7d")?;

        Ok(JwtConfig {
            access_secret,
            refresh_secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn duration_var(name: &str, default: &str) -> Result<Duration, ConfigError> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    parse_duration(&raw).map_err(|e| ConfigError::Invalid(format!("{}: {}", name, e)))
}

/// Parse a lifetime such as `900`, `45s`, `15m`, `12h` or `7d`.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("'{}' is not a duration", raw))?;

    let multiplier: u64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 60 * 60 * 24,
        other => return Err(format!("unknown duration unit '{}'", other)),
    };
    let seconds = value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("'{}' is too long", raw))?;

    if seconds == 0 {
        return Err("duration must be positive".to_string());
    }

    Ok(Duration::from_secs(seconds))
}

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Ownership role
    pub role: Role,
    /// Administrative privilege
    #[serde(default)]
    pub is_admin: bool,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Refresh token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User ID
    pub sub: Uuid,
    /// Unique token id, so two refresh tokens minted in the same second differ
    pub jti: Uuid,
    pub iat: u64,
    pub exp: u64,
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// A freshly signed token and the instant its `exp` claim points at
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token service errors
#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed, wrong kind or expired. Callers answer all of
    /// these the same way.
    #[error("invalid token")]
    InvalidToken,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("token lifetime does not fit the clock")]
    Clock,
}

/// JWT service
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl TokenService {
    /// Initialize a new token service
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        TokenService {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            validation,
            config,
        }
    }

    /// Sign an access token carrying the caller's identity and role
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        role: Role,
        is_admin: bool,
    ) -> Result<SignedToken, TokenError> {
        let now = now_secs()?;
        let claims = Claims {
            sub: user_id,
            role,
            is_admin,
            iat: now,
            exp: now + self.config.access_token_expiry.as_secs(),
            token_type: TokenType::Access,
        };

        sign(&claims, claims.exp, &self.access_encoding)
    }

    /// Sign a refresh token for a user
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<SignedToken, TokenError> {
        let now = now_secs()?;
        let claims = RefreshClaims {
            sub: user_id,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + self.config.refresh_token_expiry.as_secs(),
            token_type: TokenType::Refresh,
        };

        sign(&claims, claims.exp, &self.refresh_encoding)
    }

    /// Check signature, expiry and kind of an access token
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.access_decoding, &self.validation)
            .map_err(|_| TokenError::InvalidToken)?;

        if data.claims.token_type != TokenType::Access {
            return Err(TokenError::InvalidToken);
        }

        Ok(data.claims)
    }

    /// Check signature, expiry and kind of a refresh token
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)
            .map_err(|_| TokenError::InvalidToken)?;

        if data.claims.token_type != TokenType::Refresh {
            return Err(TokenError::InvalidToken);
        }

        Ok(data.claims)
    }

    /// Get the access token lifetime
    pub fn access_token_expiry(&self) -> Duration {
        self.config.access_token_expiry
    }

    /// Get the refresh token lifetime
    pub fn refresh_token_expiry(&self) -> Duration {
        self.config.refresh_token_expiry
    }
}

fn sign<T: Serialize>(claims: &T, exp: u64, key: &EncodingKey) -> Result<SignedToken, TokenError> {
    let expires_at = i64::try_from(exp)
        .ok()
        .and_then(|exp| DateTime::from_timestamp(exp, 0))
        .ok_or(TokenError::Clock)?;
    let token =
        encode(&Header::new(Algorithm::HS256), claims, key).map_err(TokenError::Signing)?;

    Ok(SignedToken { token, expires_at })
}

fn now_secs() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::Clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret-for-tests".to_string(),
            refresh_secret: "refresh-secret-for-tests".to_string(),
            access_token_expiry: Duration::from_secs(900),
            refresh_token_expiry: Duration::from_secs(7 * 24 * 3600),
        }
    }

    #[test]
    fn access_token_round_trip() {
        let service = TokenService::new(config());
        let user_id = Uuid::new_v4();

        let token = service
            .issue_access_token(user_id, Role::Recruiter, true)
            .unwrap();
        let claims = service.verify_access_token(&token.token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Recruiter);
        assert!(claims.is_admin);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(token.expires_at.timestamp() as u64, claims.exp);
    }

    #[test]
    fn refresh_tokens_are_unique_per_issue() {
        let service = TokenService::new(config());
        let user_id = Uuid::new_v4();

        let first = service.issue_refresh_token(user_id).unwrap();
        let second = service.issue_refresh_token(user_id).unwrap();

        assert_ne!(first.token, second.token);
        assert_eq!(service.verify_refresh_token(&first.token).unwrap().sub, user_id);
    }

    #[test]
    fn tokens_are_not_interchangeable() {
        let service = TokenService::new(config());
        let user_id = Uuid::new_v4();

        let access = service
            .issue_access_token(user_id, Role::Applicant, false)
            .unwrap();
        let refresh = service.issue_refresh_token(user_id).unwrap();

        assert!(matches!(
            service.verify_refresh_token(&access.token),
            Err(TokenError::InvalidToken)
        ));
        assert!(matches!(
            service.verify_access_token(&refresh.token),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_foreign_signature() {
        let service = TokenService::new(config());
        let mut other_config = config();
        other_config.access_secret = "someone-else".to_string();
        let other = TokenService::new(other_config);

        let token = other
            .issue_access_token(Uuid::new_v4(), Role::Applicant, false)
            .unwrap();

        assert!(matches!(
            service.verify_access_token(&token.token),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let service = TokenService::new(config());
        let now = now_secs().unwrap();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::Applicant,
            is_admin: false,
            iat: now - 3600,
            exp: now - 60,
            token_type: TokenType::Access,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &service.access_encoding,
        )
        .unwrap();

        assert!(matches!(
            service.verify_access_token(&token),
            Err(TokenError::InvalidToken)
        ));
    }

    #[test]
    fn rejects_garbage() {
        let service = TokenService::new(config());
        assert!(service.verify_access_token("not-a-jwt").is_err());
        assert!(service.verify_refresh_token("").is_err());
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("900").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("12h").unwrap(), Duration::from_secs(43_200));
        assert_eq!(parse_duration("7d").unwrap(), Duration::from_secs(604_800));
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("15w").is_err());
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("18446744073709551615d").is_err());
        assert!(parse_duration("99999999999999999999").is_err());
    }

    #[test]
    #[serial]
    fn test_jwt_config_from_env() {
        unsafe {
            std::env::set_var("JWT_ACCESS_SECRET", "a");
            std::env::set_var("JWT_REFRESH_SECRET", "b");
            std::env::remove_var("JWT_ACCESS_EXPIRES_IN");
            std::env::set_var("JWT_REFRESH_EXPIRES_IN", "30d");
        }

        let config = JwtConfig::from_env().unwrap();
        assert_eq!(config.access_token_expiry, Duration::from_secs(900));
        assert_eq!(config.refresh_token_expiry, Duration::from_secs(30 * 86_400));

        unsafe {
            std::env::remove_var("JWT_ACCESS_SECRET");
            std::env::remove_var("JWT_REFRESH_SECRET");
            std::env::remove_var("JWT_REFRESH_EXPIRES_IN");
        }
    }

    #[test]
    #[serial]
    fn test_jwt_config_rejects_shared_secret() {
        unsafe {
            std::env::set_var("JWT_ACCESS_SECRET", "same");
            std::env::set_var("JWT_REFRESH_SECRET", "same");
        }

        assert!(matches!(JwtConfig::from_env(), Err(ConfigError::Invalid(_))));

        unsafe {
            std::env::remove_var("JWT_ACCESS_SECRET");
            std::env::remove_var("JWT_REFRESH_SECRET");
        }
    }

    #[test]
    #[serial]
    fn test_jwt_config_requires_secrets() {
        unsafe {
            std::env::remove_var("JWT_ACCESS_SECRET");
            std::env::remove_var("JWT_REFRESH_SECRET");
        }

        assert!(matches!(
            JwtConfig::from_env(),
            Err(ConfigError::Missing("JWT_ACCESS_SECRET"))
        ));
    }
}
