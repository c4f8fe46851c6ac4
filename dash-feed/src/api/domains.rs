//! Per-department view, query, criteria and refresh endpoints
//!
//! Every department gets the same four routes under `/api/<key>`; the
//! handlers are generic over the mounted domain.

use crate::dashboard::Mounted;
use crate::error::ApiResult;
use crate::source::{CycleOutcome, Trigger, ViewOf};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::info;

/// Routes for one department
pub fn domain_routes<D: Mounted>() -> Router<AppState> {
    let base = format!("/api/{}", D::KEY);
    Router::new()
        .route(&base, get(get_view::<D>))
        .route(&format!("{base}/query"), post(query_view::<D>))
        .route(&format!("{base}/criteria"), put(put_criteria::<D>))
        .route(&format!("{base}/refresh"), post(refresh::<D>))
}

/// GET /api/<key> - view under the stored criteria
pub async fn get_view<D: Mounted>(State(state): State<AppState>) -> Json<ViewOf<D>> {
    Json(D::mounted(&state.dashboard).view().await)
}

/// POST /api/<key>/query - view under the posted criteria
pub async fn query_view<D: Mounted>(
    State(state): State<AppState>,
    payload: Result<Json<D::Criteria>, JsonRejection>,
) -> ApiResult<Json<ViewOf<D>>> {
    let Json(criteria) = payload?;
    Ok(Json(D::mounted(&state.dashboard).query(criteria).await))
}

/// PUT /api/<key>/criteria - replace the stored criteria
pub async fn put_criteria<D: Mounted>(
    State(state): State<AppState>,
    payload: Result<Json<D::Criteria>, JsonRejection>,
) -> ApiResult<Json<ViewOf<D>>> {
    let Json(criteria) = payload?;
    Ok(Json(D::mounted(&state.dashboard).set_criteria(criteria).await))
}

/// POST /api/<key>/refresh - run a manual fetch cycle
pub async fn refresh<D: Mounted>(State(state): State<AppState>) -> Json<CycleOutcome> {
    let outcome = D::mounted(&state.dashboard).run_cycle(Trigger::Manual).await;
    info!(source = D::KEY, ?outcome, "Manual refresh");
    Json(outcome)
}
