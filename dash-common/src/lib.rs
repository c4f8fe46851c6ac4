//! # Department Dashboard Common Library
//!
//! Shared code for the dashboard feed services including:
//! - Error and result types
//! - Configuration loading (TOML bootstrap + root folder resolution)
//! - Tracing subscriber setup (stderr or a log file)
//! - CSV parsing for spreadsheet exports
//! - Two-tier cache store (memory + durable file tier)
//! - Event types and the broadcast event bus
//! - SSE helpers and timestamp utilities

pub mod cache;
pub mod config;
pub mod csv;
pub mod error;
pub mod events;
pub mod logging;
pub mod sse;
pub mod time;

pub use cache::{CacheEntry, CacheStore, DurableStore, FileStore};
pub use csv::RawRecord;
pub use error::{Error, Result};
pub use events::{DashEvent, EventBus};
