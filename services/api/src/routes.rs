//! API service routes

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{
    error::ApiError,
    middleware::{api_rate_limit, auth_middleware, auth_rate_limit},
    state::AppState,
    store::Store,
};

mod activity;
mod applications;
mod auth;
mod dashboard;
mod postings;
mod users;

/// Create the router for the API service
pub fn create_router<S: Store>(state: AppState<S>) -> Router {
    let credential_routes = auth::credential_routes::<S>().route_layer(
        middleware::from_fn_with_state(state.clone(), auth_rate_limit::<S>),
    );

    let session_routes = auth::session_routes::<S>().route_layer(
        middleware::from_fn_with_state(state.clone(), api_rate_limit::<S>),
    );

    let protected_routes = Router::new()
        .merge(auth::profile_routes::<S>())
        .nest("/applications", applications::routes::<S>())
        .nest("/job-postings", postings::routes::<S>())
        .nest("/activity", activity::routes::<S>())
        .nest("/dashboard", dashboard::routes::<S>())
        .nest("/users", users::routes::<S>())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<S>,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_rate_limit::<S>,
        ));

    let api = Router::new()
        .merge(credential_routes)
        .merge(session_routes)
        .merge(protected_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .fallback(not_found)
        .layer(cors_layer(&state.config.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "applytrack-api"
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            warn!("CORS_ORIGIN is not a valid header value, cross-origin requests are refused");
            layer
        }
    }
}
