//! Liveness plus a readiness summary of the department sources

use crate::source::SourceStatus;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// GET /health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `starting` until every enabled source has something to serve, then `ok`
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub sources: SourceCounts,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    pub total: usize,
    pub enabled: usize,
    pub live: usize,
    /// Enabled sources still waiting for their first data
    pub loading: usize,
}

impl SourceCounts {
    pub fn tally(statuses: &[SourceStatus]) -> Self {
        statuses.iter().fold(Self::default(), |mut counts, s| {
            counts.total += 1;
            counts.enabled += usize::from(s.enabled);
            counts.live += usize::from(s.is_using_live_data);
            counts.loading += usize::from(s.loading);
            counts
        })
    }

    pub fn readiness(&self) -> &'static str {
        if self.loading > 0 {
            "starting"
        } else {
            "ok"
        }
    }
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let sources = SourceCounts::tally(&state.dashboard.statuses().await);
    Json(HealthResponse {
        status: sources.readiness(),
        module: "dash-feed",
        version: env!("CARGO_PKG_VERSION"),
        sources,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(enabled: bool, live: bool, loading: bool) -> SourceStatus {
        SourceStatus {
            key: "sales",
            records: 0,
            loading,
            is_using_live_data: live,
            last_refreshed: None,
            stale: true,
            enabled,
            fetching: false,
        }
    }

    #[test]
    fn test_tally_and_readiness() {
        let counts = SourceCounts::tally(&[
            status(true, true, false),
            status(true, false, true),
            status(false, false, false),
        ]);
        assert_eq!(
            counts,
            SourceCounts {
                total: 3,
                enabled: 2,
                live: 1,
                loading: 1
            }
        );
        assert_eq!(counts.readiness(), "starting");
        assert_eq!(SourceCounts::tally(&[status(true, true, false)]).readiness(), "ok");
    }
}
