//! Server-Sent Events for source refreshes

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events - SSE event stream
///
/// Streams `SourceRefreshed`, `SourceDegraded` and `CriteriaChanged` events
/// as they happen, after an initial `ConnectionStatus`. The stream closes on
/// server shutdown.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let shutdown = state.shutdown_token();
    dash_common::sse::create_event_sse_stream("dash-feed", state.dashboard.events(), async move {
        shutdown.cancelled().await
    })
}
