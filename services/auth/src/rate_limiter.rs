//! Sliding-window rate limiter
//!
//! Each key (normally a client IP) keeps the instants of its recent requests.
//! A request is allowed while fewer than `max_requests` of them fall inside
//! the trailing window; otherwise the caller is told how long to wait.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per window
    pub max_requests: u32,
    /// Length of the sliding window
    pub window: Duration,
}

impl RateLimiterConfig {
    /// Budget for signup and login
    pub fn auth() -> Self {
        Self {
            max_requests: 50,
            window: Duration::from_secs(15 * 60),
        }
    }

    /// Budget for the general API
    pub fn api() -> Self {
        Self {
            max_requests: 1000,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    /// Over budget; the oldest counted request leaves the window after `retry_after`
    Limited { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

/// Rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Record a request for `key` and decide whether it may proceed
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut entries = self.entries.lock().await;
        let hits = entries.entry(key.to_string()).or_default();

        while let Some(oldest) = hits.front() {
            if now.duration_since(*oldest) >= self.config.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= self.config.max_requests as usize {
            let retry_after = hits
                .front()
                .map(|oldest| self.config.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.config.window);
            warn!("Rate limit exceeded for {}", key);
            return RateLimitDecision::Limited { retry_after };
        }

        hits.push_back(now);
        RateLimitDecision::Allowed
    }

    /// Drop keys whose every request has left the window
    pub async fn prune(&self) -> usize {
        self.prune_at(Instant::now()).await
    }

    async fn prune_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, hits| {
            hits.back()
                .is_some_and(|latest| now.duration_since(*latest) < self.config.window)
        });
        before - entries.len()
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}
