//! Activity log endpoint

use axum::{Json, Router, extract::State, routing::get};
use common::{PageRequest, Paginated};

use crate::{
    error::{ApiError, ApiResult, QueryParams},
    middleware::AuthUser,
    models::{ActivityEntry, ListActivityQuery},
    state::AppState,
    store::{ActivityFilter, Store},
};

pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new().route("/", get(list::<S>))
}

/// Newest entries first, scoped like applications
async fn list<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    QueryParams(query): QueryParams<ListActivityQuery>,
) -> ApiResult<Json<Paginated<ActivityEntry>>> {
    let page = PageRequest::new(query.page, query.page_size).map_err(ApiError::InvalidInput)?;
    let filter = ActivityFilter::new(caller.scope()?, &query);

    let (rows, total) = state.store.list_activity(&filter, page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}
