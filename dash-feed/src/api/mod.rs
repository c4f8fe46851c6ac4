//! HTTP API handlers for dash-feed

pub mod buildinfo;
pub mod domains;
pub mod health;
pub mod sources;
pub mod sse;

pub use buildinfo::{get_build_info, BUILD};
pub use domains::domain_routes;
pub use health::health_routes;
pub use sources::list_sources;
pub use sse::event_stream;
