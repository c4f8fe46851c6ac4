//! Source status listing

use crate::source::SourceStatus;
use crate::AppState;
use axum::{extract::State, Json};

/// GET /api/sources
///
/// One entry per department source, in fixed order.
pub async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceStatus>> {
    Json(state.dashboard.statuses().await)
}
