//! The five department sources, wired to one cache and one event bus

use crate::domains::{Domain, Finance, Hr, Marketing, Sales, Support};
use crate::source::{FetchError, PollHandle, PollingDataSource, SourceStatus};
use dash_common::config::TomlConfig;
use dash_common::{CacheStore, EventBus};
use std::sync::Arc;
use tracing::{info, warn};

/// Source names accepted in `[sources.<name>]` config tables
pub const SOURCE_KEYS: [&str; 5] = [Sales::KEY, Marketing::KEY, Finance::KEY, Hr::KEY, Support::KEY];

pub struct Dashboard {
    pub sales: Arc<PollingDataSource<Sales>>,
    pub marketing: Arc<PollingDataSource<Marketing>>,
    pub finance: Arc<PollingDataSource<Finance>>,
    pub hr: Arc<PollingDataSource<Hr>>,
    pub support: Arc<PollingDataSource<Support>>,
    events: EventBus,
}

impl Dashboard {
    /// Build every source from its defaults plus the config overrides
    pub fn new(
        config: &TomlConfig,
        cache: Arc<CacheStore>,
        events: EventBus,
    ) -> Result<Self, FetchError> {
        for name in config.sources.keys() {
            if !SOURCE_KEYS.contains(&name.as_str()) {
                warn!(source = %name, "Ignoring config for unknown source");
            }
        }

        Ok(Self {
            sales: build_source(config, &cache, &events)?,
            marketing: build_source(config, &cache, &events)?,
            finance: build_source(config, &cache, &events)?,
            hr: build_source(config, &cache, &events)?,
            support: build_source(config, &cache, &events)?,
            events,
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Start polling every enabled source
    pub fn start_polling(&self) -> Vec<PollHandle> {
        let mut handles = Vec::with_capacity(SOURCE_KEYS.len());
        start_enabled(&self.sales, &mut handles);
        start_enabled(&self.marketing, &mut handles);
        start_enabled(&self.finance, &mut handles);
        start_enabled(&self.hr, &mut handles);
        start_enabled(&self.support, &mut handles);
        info!(polling = handles.len(), "Source polling started");
        handles
    }

    pub async fn statuses(&self) -> Vec<SourceStatus> {
        vec![
            self.sales.status().await,
            self.marketing.status().await,
            self.finance.status().await,
            self.hr.status().await,
            self.support.status().await,
        ]
    }
}

fn build_source<D: Domain>(
    config: &TomlConfig,
    cache: &Arc<CacheStore>,
    events: &EventBus,
) -> Result<Arc<PollingDataSource<D>>, FetchError> {
    let mut source_config = D::default_config();
    if let Some(overrides) = config.sources.get(D::KEY) {
        source_config = source_config.apply_override(overrides);
    }
    let source = PollingDataSource::new(source_config, Arc::clone(cache), events.clone())?;
    Ok(Arc::new(source))
}

fn start_enabled<D: Domain>(source: &Arc<PollingDataSource<D>>, handles: &mut Vec<PollHandle>) {
    if source.config().enabled {
        handles.push(Arc::clone(source).start());
    } else {
        info!(source = D::KEY, "Source disabled, not polling");
    }
}

/// Domains reachable through a [`Dashboard`]
pub trait Mounted: Domain {
    fn mounted(dashboard: &Dashboard) -> &Arc<PollingDataSource<Self>>;
}

impl Mounted for Sales {
    fn mounted(dashboard: &Dashboard) -> &Arc<PollingDataSource<Self>> {
        &dashboard.sales
    }
}

impl Mounted for Marketing {
    fn mounted(dashboard: &Dashboard) -> &Arc<PollingDataSource<Self>> {
        &dashboard.marketing
    }
}

impl Mounted for Finance {
    fn mounted(dashboard: &Dashboard) -> &Arc<PollingDataSource<Self>> {
        &dashboard.finance
    }
}

impl Mounted for Hr {
    fn mounted(dashboard: &Dashboard) -> &Arc<PollingDataSource<Self>> {
        &dashboard.hr
    }
}

impl Mounted for Support {
    fn mounted(dashboard: &Dashboard) -> &Arc<PollingDataSource<Self>> {
        &dashboard.support
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_common::config::SourceOverride;
    use std::time::Duration;

    #[tokio::test]
    async fn test_overrides_applied_per_source() {
        let mut config = TomlConfig::default();
        config.sources.insert(
            "hr".to_string(),
            SourceOverride {
                candidates: Some(vec!["http://127.0.0.1:9/hr.csv".to_string()]),
                poll_interval_secs: Some(30),
                enabled: Some(false),
                ..Default::default()
            },
        );

        let dashboard =
            Dashboard::new(&config, Arc::new(CacheStore::in_memory()), EventBus::new(8)).unwrap();
        let hr = dashboard.hr.config();
        assert_eq!(hr.candidates, vec!["http://127.0.0.1:9/hr.csv".to_string()]);
        assert_eq!(hr.poll_interval, Duration::from_secs(30));
        assert!(!hr.enabled);
        assert_eq!(dashboard.sales.config().poll_interval, Duration::from_secs(300));

        let statuses = dashboard.statuses().await;
        let keys: Vec<&str> = statuses.iter().map(|s| s.key).collect();
        assert_eq!(keys, SOURCE_KEYS.to_vec());
    }

    #[tokio::test]
    async fn test_disabled_sources_not_polled() {
        let mut config = TomlConfig::default();
        for key in SOURCE_KEYS {
            config.sources.insert(
                key.to_string(),
                SourceOverride {
                    enabled: Some(false),
                    ..Default::default()
                },
            );
        }
        let dashboard =
            Dashboard::new(&config, Arc::new(CacheStore::in_memory()), EventBus::new(8)).unwrap();
        assert!(dashboard.start_polling().is_empty());
    }
}
