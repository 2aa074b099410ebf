//! Job application endpoints

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use common::{PageRequest, Paginated};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult, JsonBody, PathParam, QueryParams},
    middleware::AuthUser,
    models::{ApplicationPatch, CreateApplicationRequest, JobApplication, ListApplicationsQuery},
    state::AppState,
    store::{ApplicationFilter, Store},
    workflow,
};

pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(list::<S>).post(create::<S>))
        .route(
            "/:id",
            get(get_one::<S>).patch(update::<S>).delete(delete::<S>),
        )
        .route("/:id/archive", post(archive::<S>))
        .route("/:id/restore", post(restore::<S>))
}

async fn list<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    QueryParams(query): QueryParams<ListApplicationsQuery>,
) -> ApiResult<Json<Paginated<JobApplication>>> {
    let page = PageRequest::new(query.page, query.page_size).map_err(ApiError::InvalidInput)?;
    let filter = ApplicationFilter::new(caller.scope()?, &query);

    let (rows, total) = state.store.list_applications(&filter, page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

async fn get_one<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Json<JobApplication>> {
    let application = state
        .store
        .find_application(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job application"))?;

    caller.check_application(&application)?;
    Ok(Json(application))
}

async fn create<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    JsonBody(request): JsonBody<CreateApplicationRequest>,
) -> ApiResult<impl IntoResponse> {
    let application = workflow::create_application(&state.store, &caller, request).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

async fn update<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(patch): JsonBody<ApplicationPatch>,
) -> ApiResult<Json<JobApplication>> {
    let application = workflow::update_application(
        &state.store,
        &caller,
        id,
        patch,
        state.config.allow_recruiter_status_edit,
    )
    .await?;
    Ok(Json(application))
}

async fn archive<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Json<JobApplication>> {
    Ok(Json(
        workflow::archive_application(&state.store, &caller, id).await?,
    ))
}

async fn restore<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Json<JobApplication>> {
    Ok(Json(
        workflow::restore_application(&state.store, &caller, id).await?,
    ))
}

async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<StatusCode> {
    workflow::delete_application(&state.store, &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
