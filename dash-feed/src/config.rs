//! Per-source polling configuration
//!
//! Built-in defaults live with each domain; `[sources.<name>]` tables in the
//! TOML config override individual fields.

use dash_common::cache::DEFAULT_TTL;
use dash_common::config::SourceOverride;
use std::time::Duration;
use tracing::warn;

/// Spreadsheet holding the sales, marketing, hr and support tabs
pub const DEPARTMENT_SHEET_ID: &str = "1v-imyFcNfNR-Mr6gH9vccr2QaQc7oLSUc7ozPLoGgxQ";

/// Spreadsheet holding the finance ledger
pub const FINANCE_SHEET_ID: &str = "1CQLg1Fep3MNB_tidEXdOtj1VQNz5YXUT2zRSv5j1GHA";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(2);

/// Ways a published spreadsheet tab can be exported as CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportVariant {
    /// `/export?format=csv&gid=N`
    Export,
    /// `/gviz/tq?tqx=out:csv&gid=N`
    Gviz,
    /// `/pub?output=csv&gid=N`
    Published,
    /// `/export?format=csv&usp=sharing` (first tab of a link-shared sheet)
    Shared,
}

impl ExportVariant {
    pub fn url(self, sheet_id: &str, gid: &str) -> String {
        let base = format!("https://docs.google.com/spreadsheets/d/{sheet_id}");
        match self {
            ExportVariant::Export => format!("{base}/export?format=csv&gid={gid}"),
            ExportVariant::Gviz => format!("{base}/gviz/tq?tqx=out:csv&gid={gid}"),
            ExportVariant::Published => format!("{base}/pub?output=csv&gid={gid}"),
            ExportVariant::Shared => format!("{base}/export?format=csv&usp=sharing"),
        }
    }
}

/// Candidate URLs for one sheet tab, in the given order
pub fn sheet_candidates(sheet_id: &str, gid: &str, variants: &[ExportVariant]) -> Vec<String> {
    variants.iter().map(|v| v.url(sheet_id, gid)).collect()
}

/// Everything the polling controller needs to know about one source
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    /// Source name (`sales`, `marketing`, ...)
    pub name: String,
    /// Cache store key
    pub cache_key: String,
    /// Export URLs, tried in order
    pub candidates: Vec<String>,
    /// Period of the repeating fetch cycle
    pub poll_interval: Duration,
    /// Minimum time between the starts of two non-initial cycles
    pub cooldown: Duration,
    pub cache_ttl: Duration,
    /// Per-request timeout; `None` leaves it to the transport
    pub request_timeout: Option<Duration>,
    /// Disabled sources are never polled
    pub enabled: bool,
}

impl SourceConfig {
    /// Config with the shared defaults (2 s period, 2 s cooldown, 60 s TTL)
    pub fn new(name: &str, candidates: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            cache_key: format!("{name}_data"),
            candidates,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cooldown: DEFAULT_COOLDOWN,
            cache_ttl: DEFAULT_TTL,
            request_timeout: None,
            enabled: true,
        }
    }

    pub fn with_poll_interval(mut self, period: Duration) -> Self {
        self.poll_interval = period;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Apply the set fields of a TOML override
    pub fn apply_override(mut self, o: &SourceOverride) -> Self {
        if let Some(candidates) = &o.candidates {
            if candidates.is_empty() {
                warn!("{}: empty candidate list in config ignored", self.name);
            } else {
                self.candidates = candidates.clone();
            }
        }
        if let Some(secs) = o.poll_interval_secs {
            if secs == 0 {
                warn!("{}: poll_interval_secs = 0 ignored", self.name);
            } else {
                self.poll_interval = Duration::from_secs(secs);
            }
        }
        if let Some(secs) = o.cooldown_secs {
            self.cooldown = Duration::from_secs(secs);
        }
        if let Some(secs) = o.cache_ttl_secs {
            self.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = o.request_timeout_secs {
            self.request_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(enabled) = o.enabled {
            self.enabled = enabled;
        }
        if self.cooldown > self.poll_interval {
            warn!(
                "{}: cooldown {:?} exceeds poll interval {:?}, some ticks will be skipped",
                self.name, self.cooldown, self.poll_interval
            );
        }
        self
    }
}
