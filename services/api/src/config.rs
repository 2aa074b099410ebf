//! Service configuration loaded from the environment

use auth::RateLimiterConfig;
use auth::jwt::{ConfigError, parse_duration};
use std::env;

/// Process-wide settings of the API service
///
/// Loaded once at startup and shared read-only through `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `APP_ENV=production` marks the refresh cookie `Secure`
    pub production: bool,
    pub cors_origin: String,
    /// Let recruiters change the status of their company's applications
    pub allow_recruiter_status_edit: bool,
    pub auth_rate_limit: RateLimiterConfig,
    pub api_rate_limit: RateLimiterConfig,
    /// Key rate limits on `x-real-ip`/`x-forwarded-for` instead of the peer
    pub trust_proxy: bool,
    /// Six-field cron expression of the expired refresh-token purge
    pub token_purge_schedule: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            production: false,
            cors_origin: "http://localhost:5173".to_string(),
            allow_recruiter_status_edit: false,
            auth_rate_limit: RateLimiterConfig::auth(),
            api_rate_limit: RateLimiterConfig::api(),
            trust_proxy: false,
            token_purge_schedule: "0 0 * * * *".to_string(),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// Every variable is optional; unset ones take the [`Default`] value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT: '{}' is not a port", raw)))?,
            Err(_) => defaults.port,
        };

        let production = env::var("APP_ENV")
            .map(|value| value.eq_ignore_ascii_case("production"))
            .unwrap_or(defaults.production);

        let cors_origin = env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        let allow_recruiter_status_edit =
            bool_var("ALLOW_RECRUITER_STATUS_EDIT", defaults.allow_recruiter_status_edit)?;

        let auth_rate_limit = rate_limit_var(
            "AUTH_RATE_LIMIT_MAX",
            "AUTH_RATE_LIMIT_WINDOW",
            defaults.auth_rate_limit,
        )?;
        let api_rate_limit = rate_limit_var(
            "API_RATE_LIMIT_MAX",
            "API_RATE_LIMIT_WINDOW",
            defaults.api_rate_limit,
        )?;

        let trust_proxy = bool_var("TRUST_PROXY", defaults.trust_proxy)?;

        let token_purge_schedule =
            env::var("TOKEN_PURGE_SCHEDULE").unwrap_or(defaults.token_purge_schedule);

        Ok(Self {
            port,
            production,
            cors_origin,
            allow_recruiter_status_edit,
            auth_rate_limit,
            api_rate_limit,
            trust_proxy,
            token_purge_schedule,
        })
    }
}

fn bool_var(name: &str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid(format!("{}: '{}' is not a boolean", name, raw))),
        },
        Err(_) => Ok(default),
    }
}

fn rate_limit_var(
    max_name: &str,
    window_name: &str,
    default: RateLimiterConfig,
) -> Result<RateLimiterConfig, ConfigError> {
    let max_requests = match env::var(max_name) {
        Ok(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|max| *max > 0)
            .ok_or_else(|| {
                ConfigError::Invalid(format!("{}: '{}' is not a positive integer", max_name, raw))
            })?,
        Err(_) => default.max_requests,
    };

    let window = match env::var(window_name) {
        Ok(raw) => parse_duration(&raw)
            .map_err(|e| ConfigError::Invalid(format!("{}: {}", window_name, e)))?,
        Err(_) => default.window,
    };

    Ok(RateLimiterConfig {
        max_requests,
        window,
    })
}
