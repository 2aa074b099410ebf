//! Session endpoints: signup, login, refresh, logout, profile

use auth::IssuedSession;
use auth::models::{LoginCredentials, NewAccount, ProfileUpdate, UserProfile};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use cookie::time::Duration;
use serde::Serialize;
use serde_json::json;

use crate::{
    error::{ApiResult, JsonBody},
    middleware::AuthUser,
    state::AppState,
    store::Store,
};

pub const REFRESH_COOKIE: &str = "refreshToken";

/// Body of every response that opens or rotates a session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user: UserProfile,
    access_token: String,
}

/// Signup and login, throttled by the auth budget
pub fn credential_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/auth/signup", post(signup::<S>))
        .route("/auth/login", post(login::<S>))
}

/// Refresh and logout only need the refresh cookie
pub fn session_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/auth/refresh", post(refresh::<S>))
        .route("/auth/logout", post(logout::<S>))
}

pub fn profile_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/auth/me", get(me::<S>))
        .route("/auth/profile", patch(update_profile::<S>))
}

async fn signup<S: Store>(
    State(state): State<AppState<S>>,
    jar: CookieJar,
    JsonBody(account): JsonBody<NewAccount>,
) -> ApiResult<impl IntoResponse> {
    let session = state.sessions.signup(account).await?;
    let (jar, body) = open(&state, jar, session);
    Ok((StatusCode::CREATED, jar, body))
}

async fn login<S: Store>(
    State(state): State<AppState<S>>,
    jar: CookieJar,
    JsonBody(credentials): JsonBody<LoginCredentials>,
) -> ApiResult<impl IntoResponse> {
    let session = state.sessions.login(credentials).await?;
    Ok(open(&state, jar, session))
}

async fn refresh<S: Store>(
    State(state): State<AppState<S>>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    let presented = jar.get(REFRESH_COOKIE).map(|cookie| cookie.value().to_string());
    let session = state.sessions.refresh(presented.as_deref()).await?;
    Ok(open(&state, jar, session))
}

async fn logout<S: Store>(
    State(state): State<AppState<S>>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    let presented = jar.get(REFRESH_COOKIE).map(|cookie| cookie.value().to_string());
    state.sessions.logout(presented.as_deref()).await?;

    let jar = jar.remove(Cookie::build(REFRESH_COOKIE).path("/"));
    Ok((jar, Json(json!({ "message": "Logged out successfully" }))))
}

async fn me<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.sessions.me(caller.id).await?))
}

async fn update_profile<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.sessions.update_profile(caller.id, update).await?))
}

/// Hand the refresh token over as a cookie and the rest as the body
fn open<S>(
    state: &AppState<S>,
    jar: CookieJar,
    session: IssuedSession,
) -> (CookieJar, Json<SessionResponse>) {
    let max_age = (session.refresh_expires_at - Utc::now()).num_seconds().max(0);
    let cookie = Cookie::build((REFRESH_COOKIE, session.refresh_token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.production)
        .max_age(Duration::seconds(max_age));

    (
        jar.add(cookie),
        Json(SessionResponse {
            user: session.user,
            access_token: session.access_token,
        }),
    )
}
