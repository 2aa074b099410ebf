//! User administration, admins only

use auth::models::{User, UserProfile, UserUpdate, check_role_company};
use auth::validation;
use axum::{Json, Router, extract::State, routing::get};
use common::{PageRequest, Paginated};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult, JsonBody, PathParam, QueryParams},
    middleware::AuthUser,
    models::{ListUsersQuery, UserDetail, UserSummary},
    state::AppState,
    store::{Store, UserFilter},
};

pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(list::<S>))
        .route("/:id", get(get_one::<S>).patch(update::<S>))
}

async fn list<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    QueryParams(query): QueryParams<ListUsersQuery>,
) -> ApiResult<Json<Paginated<UserSummary>>> {
    caller.require_admin()?;
    let page = PageRequest::new(query.page, query.page_size).map_err(ApiError::InvalidInput)?;

    let (rows, total) = state.store.list_users(&UserFilter::new(&query), page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

async fn get_one<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Json<UserDetail>> {
    caller.require_admin()?;

    let user = state
        .store
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(Json(detail(&state.store, &user).await?))
}

async fn update<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(mut update): JsonBody<UserUpdate>,
) -> ApiResult<Json<UserDetail>> {
    caller.require_admin()?;
    if update.is_empty() {
        return Err(ApiError::InvalidInput("No fields to update".to_string()));
    }

    if let Some(name) = &update.name {
        validation::validate_name(name).map_err(ApiError::InvalidInput)?;
    }
    if let Some(Some(company)) = &update.company {
        validation::validate_company(company).map_err(ApiError::InvalidInput)?;
    }
    update.name = update.name.map(|name| name.trim().to_string());
    update.company = update
        .company
        .map(|company| company.map(|company| company.trim().to_string()));

    if id == caller.id && (update.is_active == Some(false) || update.is_admin == Some(false)) {
        return Err(ApiError::Forbidden(
            "Admins cannot deactivate or demote their own account".to_string(),
        ));
    }

    let user = state
        .store
        .edit_user(id, |current| -> Result<User, ApiError> {
            let next = update.applied_to(current);
            check_role_company(next.role, next.company.as_deref())
                .map_err(ApiError::InvalidInput)?;
            Ok(next)
        })
        .await?
        .ok_or_else(|| ApiError::not_found("User"))??;

    info!("Admin {} updated user {}", caller.id, user.id);
    Ok(Json(detail(&state.store, &user).await?))
}

async fn detail<S: Store>(store: &S, user: &User) -> ApiResult<UserDetail> {
    Ok(UserDetail {
        profile: UserProfile::from(user),
        application_count: store.count_applications(user.id).await?,
        active_sessions: store.count_refresh_tokens(user.id).await?,
    })
}
