//! Request middleware: access-token authentication and rate limiting

use std::net::SocketAddr;

use auth::models::{Role, User};
use auth::{RateLimitDecision, RateLimiter};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::warn;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState, store::Store};

/// Authenticated caller
///
/// Built from the current user row rather than the token claims, so a role
/// change or deactivation takes effect on the caller's next request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub company: Option<String>,
    pub is_admin: bool,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            company: user.company.clone(),
            is_admin: user.is_admin,
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(ApiError::unauthorized)
    }
}

/// Authentication middleware
pub async fn auth_middleware<S: Store>(
    State(state): State<AppState<S>>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(ApiError::unauthorized)?;

    let claims = state
        .tokens()
        .verify_access_token(bearer.token())
        .map_err(|_| {
            warn!("Rejected request with an invalid access token");
            ApiError::Unauthorized("Invalid or expired access token".to_string())
        })?;

    let user = state
        .store
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    if !user.is_active {
        warn!("Rejected request from disabled user {}", user.id);
        return Err(ApiError::AccountDisabled);
    }

    req.extensions_mut().insert(AuthUser::from(&user));

    Ok(next.run(req).await)
}

/// Throttle signup and login per client
pub async fn auth_rate_limit<S: Store>(
    State(state): State<AppState<S>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_ip(&req, state.config.trust_proxy);
    enforce(&state.auth_limiter, &key).await?;
    Ok(next.run(req).await)
}

/// Throttle the general API per client
pub async fn api_rate_limit<S: Store>(
    State(state): State<AppState<S>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_ip(&req, state.config.trust_proxy);
    enforce(&state.api_limiter, &key).await?;
    Ok(next.run(req).await)
}

async fn enforce(limiter: &RateLimiter, key: &str) -> Result<(), ApiError> {
    match limiter.check(key).await {
        RateLimitDecision::Allowed => Ok(()),
        RateLimitDecision::Limited { retry_after } => {
            Err(ApiError::TooManyRequests { retry_after })
        }
    }
}

/// Client address used as the rate-limit key
///
/// The socket peer, unless `trust_proxy` is set: then `x-real-ip`, then the
/// first `x-forwarded-for` hop, then the peer. Forwarding headers are only
/// meaningful when a reverse proxy overwrites them.
pub fn client_ip(req: &Request, trust_proxy: bool) -> String {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    let forwarded = trust_proxy
        .then(|| {
            req.headers()
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .filter(|ip| !ip.trim().is_empty())
                .or_else(|| {
                    req.headers()
                        .get("x-forwarded-for")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
                })
        })
        .flatten();

    forwarded
        .or(peer.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}
