//! Dashboard endpoints

use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use common::PageRequest;

use crate::{
    dashboard::compute_stats,
    error::ApiResult,
    middleware::AuthUser,
    models::{DashboardStats, RecentActivity},
    state::AppState,
    store::{ActivityFilter, Store},
};

const RECENT_ACTIVITY: u32 = 10;

pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/stats", get(stats::<S>))
        .route("/activity", get(recent_activity::<S>))
}

async fn stats<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
) -> ApiResult<Json<DashboardStats>> {
    let facts = state.store.application_facts(&caller.scope()?).await?;
    Ok(Json(compute_stats(&facts, Utc::now())))
}

async fn recent_activity<S: Store>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
) -> ApiResult<Json<Vec<RecentActivity>>> {
    let filter = ActivityFilter::scoped(caller.scope()?);
    let (rows, _) = state
        .store
        .list_activity(&filter, PageRequest::first(RECENT_ACTIVITY))
        .await?;
    Ok(Json(rows.into_iter().map(RecentActivity::from).collect()))
}
