//! dash-feed library - department dashboard data feed
//!
//! Polls the published spreadsheet export of each department, keeps the
//! last good collection in a two-tier cache, and serves filtered views,
//! KPIs and insights over HTTP.

use axum::{http::Uri, Router};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod coerce;
pub mod config;
pub mod dashboard;
pub mod domains;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod source;

pub use dashboard::{Dashboard, Mounted};
pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    /// Cancelled when the server begins shutting down
    shutdown: CancellationToken,
}

impl AppState {
    /// Create new application state
    pub fn new(dashboard: Arc<Dashboard>) -> Self {
        Self {
            dashboard,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that ends long-lived responses (SSE) once cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;
    use domains::{Finance, Hr, Marketing, Sales, Support};

    let departments = Router::new()
        .merge(api::domain_routes::<Sales>())
        .merge(api::domain_routes::<Marketing>())
        .merge(api::domain_routes::<Finance>())
        .merge(api::domain_routes::<Hr>())
        .merge(api::domain_routes::<Support>());

    Router::new()
        .route("/api/sources", get(api::list_sources))
        .route("/api/events", get(api::event_stream))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(departments)
        .merge(api::health_routes())
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
