//! Job posting endpoints

use auth::models::Role;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use common::{PageRequest, Paginated};
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult, JsonBody, PathParam, QueryParams},
    middleware::AuthUser,
    models::{
        ApplyRequest, CreatePostingRequest, JobPosting, ListPostingsQuery, NewPosting,
        PostingPatch, PostingStatus,
    },
    state::AppState,
    store::{JobPostingStore, PostingFilter, Store},
    workflow,
};

pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(list::<S>).post(create::<S>))
        .route(
            "/:id",
            get(get_one::<S>).put(update::<S>).delete(delete::<S>),
        )
        .route("/:id/apply", post(apply::<S>))
}

async fn list<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    QueryParams(query): QueryParams<ListPostingsQuery>,
) -> ApiResult<Json<Paginated<JobPosting>>> {
    let page = PageRequest::new(query.page, query.page_size).map_err(ApiError::InvalidInput)?;
    let filter = PostingFilter::new(caller.posting_scope()?, &query);

    let (rows, total) = state.store.list_postings(&filter, page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

async fn get_one<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Json<JobPosting>> {
    let posting = find(&state.store, id).await?;
    caller.check_posting(&posting)?;
    Ok(Json(posting))
}

async fn create<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    JsonBody(request): JsonBody<CreatePostingRequest>,
) -> ApiResult<impl IntoResponse> {
    caller.require_role(Role::Recruiter)?;
    request.validate().map_err(ApiError::InvalidInput)?;

    let own_company = caller.company()?;
    let company = match request.company.as_deref().map(str::trim) {
        None | Some("") => own_company.to_string(),
        Some(company) if company == own_company => company.to_string(),
        Some(_) => {
            return Err(ApiError::Forbidden(
                "Recruiters can only post jobs for their own company".to_string(),
            ));
        }
    };

    let posting = state
        .store
        .insert_posting(NewPosting {
            recruiter_id: caller.id,
            company,
            role_title: request.role_title.trim().to_string(),
            location: request.location,
            work_mode: request.work_mode,
            employment_type: request.employment_type,
            description: request.description,
            requirements: request.requirements,
            salary_range: request.salary_range,
            status: request.status.unwrap_or(PostingStatus::Open),
        })
        .await?;

    info!("Recruiter {} published posting {}", caller.id, posting.id);
    Ok((StatusCode::CREATED, Json(posting)))
}

async fn update<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(patch): JsonBody<PostingPatch>,
) -> ApiResult<Json<JobPosting>> {
    let posting = find(&state.store, id).await?;
    caller.check_posting_owner(&posting)?;
    patch.validate().map_err(ApiError::InvalidInput)?;

    let posting = state
        .store
        .update_posting(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Job posting"))?;
    Ok(Json(posting))
}

async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<StatusCode> {
    let posting = find(&state.store, id).await?;
    caller.check_posting_owner(&posting)?;

    if !state.store.delete_posting(id).await? {
        return Err(ApiError::not_found("Job posting"));
    }

    info!("Recruiter {} deleted posting {}", caller.id, id);
    Ok(StatusCode::NO_CONTENT)
}

async fn apply<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
    body: Option<JsonBody<ApplyRequest>>,
) -> ApiResult<impl IntoResponse> {
    let request = body.map(|JsonBody(request)| request).unwrap_or_default();
    let application = workflow::apply_to_posting(&state.store, &caller, id, request).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

async fn find<S: JobPostingStore>(store: &S, id: Uuid) -> ApiResult<JobPosting> {
    store
        .find_posting(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job posting"))
}
