//! Custom error types for the API service

use std::time::Duration;

use auth::SessionError;
use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use common::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
///
/// Every variant renders as `{"error": <code>, "message": <text>}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or semantically invalid request
    #[error("{0}")]
    InvalidInput(String),

    /// The resource is not in a state that allows the operation
    #[error("{0}")]
    InvalidState(String),

    /// Missing or invalid access token
    #[error("{0}")]
    Unauthorized(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired refresh token")]
    InvalidOrExpiredToken,

    /// Authenticated but not permitted
    #[error("{0}")]
    Forbidden(String),

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests, please try again later")]
    TooManyRequests { retry_after: Duration },

    /// Details are logged where the error is raised, never returned
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("Authentication required".to_string())
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden("You do not have permission to perform this action".to_string())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }

    /// Machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::InvalidState(_) => "invalid_state",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::InvalidOrExpiredToken => "invalid_or_expired_token",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::AccountDisabled => "account_disabled",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::TooManyRequests { .. } => "too_many_requests",
            ApiError::Internal => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::InvalidState(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_)
            | ApiError::InvalidCredentials
            | ApiError::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::AccountDisabled => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));

        let mut response = (self.status(), body).into_response();

        if let ApiError::TooManyRequests { retry_after } = self {
            // Whole seconds, rounded up
            let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&seconds.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(_) => ApiError::Conflict("Resource already exists".to_string()),
            other => {
                error!("Database error: {}", other);
                ApiError::Internal
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidInput(message) => ApiError::InvalidInput(message),
            SessionError::Conflict => {
                ApiError::Conflict("An account with this email already exists".to_string())
            }
            SessionError::InvalidCredentials => ApiError::InvalidCredentials,
            SessionError::AccountDisabled => ApiError::AccountDisabled,
            SessionError::MissingRefreshToken => {
                ApiError::Unauthorized("Refresh token required".to_string())
            }
            SessionError::InvalidOrExpiredToken => ApiError::InvalidOrExpiredToken,
            SessionError::NotFound => ApiError::not_found("User"),
            SessionError::Database(db) => db.into(),
            SessionError::Token(_) | SessionError::Password(_) => {
                error!("Session failure: {}", err);
                ApiError::Internal
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}

/// `axum::Json` whose rejection is an [`ApiError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` whose rejection is an [`ApiError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// `axum::extract::Path` whose rejection is an [`ApiError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
