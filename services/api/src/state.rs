//! Application state shared across handlers

use std::sync::Arc;

use auth::{RateLimiter, SessionManager, TokenService};

use crate::config::AppConfig;
use crate::store::Store;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState<S> {
    pub store: S,
    pub sessions: SessionManager<S>,
    pub config: Arc<AppConfig>,
    /// Signup and login budget per client
    pub auth_limiter: RateLimiter,
    /// Budget of every other `/api` route per client
    pub api_limiter: RateLimiter,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, tokens: TokenService, config: AppConfig) -> Self {
        Self {
            sessions: SessionManager::new(store.clone(), tokens),
            auth_limiter: RateLimiter::new(config.auth_rate_limit.clone()),
            api_limiter: RateLimiter::new(config.api_rate_limit.clone()),
            config: Arc::new(config),
            store,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        self.sessions.tokens()
    }
}
