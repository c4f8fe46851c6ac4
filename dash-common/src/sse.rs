//! Server-Sent Events (SSE) utilities
//!
//! Forwards [`DashEvent`]s from the bus to an SSE client, with heartbeats.

use crate::events::{DashEvent, EventBus};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::future::Future;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Heartbeat / keep-alive interval
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Convert a bus event into an SSE event (name = event type, data = JSON)
pub fn to_sse_event(event: &DashEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event.event_type()).data(data)
}

/// Create an SSE stream relaying every bus event to one client
///
/// The stream starts with a `ConnectionStatus` event. A lagging client skips
/// the events it missed and keeps streaming. The stream ends when `shutdown`
/// completes, so open clients do not hold up a graceful server shutdown.
pub fn create_event_sse_stream(
    service_name: &'static str,
    bus: &EventBus,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = bus.subscribe();
    info!(
        subscribers = bus.subscriber_count(),
        "New SSE client connected to {} events", service_name
    );

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => {
                    debug!("SSE: forwarding {}", event.event_type());
                    yield Ok(to_sse_event(&event));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: {} client lagged, skipped {} events", service_name, skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event bus closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream.take_until(shutdown)).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
