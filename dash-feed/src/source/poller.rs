//! Polling data source
//!
//! One [`PollingDataSource`] per department. It owns the record collection
//! and the stored criteria, runs fetch cycles on a fixed schedule, and keeps
//! serving the last good collection (or the seed set) when every candidate
//! fails.
//!
//! Cycles are single-flight: a trigger that arrives while a fetch is running
//! is dropped, not queued. A cooldown additionally rejects scheduled cycles
//! that start too soon after the previous one; initial and manual cycles
//! always fetch.

use super::fetcher::{FetchError, Fetched, SourceFetcher};
use super::view::{Snapshot, SourceStatus, ViewOf};
use crate::config::SourceConfig;
use crate::domains::Domain;
use chrono::{DateTime, Utc};
use dash_common::{CacheStore, DashEvent, EventBus};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What started a fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// First cycle after start; ignores the cooldown
    Initial,
    /// Timer tick; skipped inside the cooldown
    Scheduled,
    /// Explicit refresh request; ignores the cooldown
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    InFlight,
    Cooldown,
    Disabled,
}

/// What the source shows after all candidates failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Fallback {
    /// Last successfully fetched (or cached) collection
    Retained,
    /// The domain's embedded seed records
    Seed,
    /// Nothing to show
    Empty,
}

impl Fallback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Fallback::Retained => "retained",
            Fallback::Seed => "seed",
            Fallback::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CycleOutcome {
    Skipped { reason: SkipReason },
    Live { records: usize, candidate: usize },
    Degraded { attempts: usize, fallback: Fallback },
}

struct SourceState<D: Domain> {
    records: Vec<D::Record>,
    loading: bool,
    live: bool,
    /// `records` is the embedded seed set, not fetched data
    seeded: bool,
    criteria: D::Criteria,
    last_success: Option<DateTime<Utc>>,
}

/// Clears the in-flight flag however the cycle ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PollingDataSource<D: Domain> {
    config: SourceConfig,
    fetcher: SourceFetcher,
    cache: Arc<CacheStore>,
    events: EventBus,
    state: RwLock<SourceState<D>>,
    in_flight: AtomicBool,
    /// Logical start of the last accepted cycle
    last_cycle: Mutex<Option<Instant>>,
}

impl<D: Domain> PollingDataSource<D> {
    /// Create the source, seeding its collection from the cache
    ///
    /// `loading` starts true only when the cache had nothing for this source.
    /// A disabled source never fetches, so it falls back to the seed set
    /// immediately instead.
    pub fn new(
        config: SourceConfig,
        cache: Arc<CacheStore>,
        events: EventBus,
    ) -> Result<Self, FetchError> {
        let fetcher = SourceFetcher::new(config.request_timeout)?;
        let cached: Option<Vec<D::Record>> = cache.get(&config.cache_key);

        let (records, loading, seeded) = match cached {
            Some(records) => (records, false, false),
            None if !config.enabled => {
                let seed = D::seed();
                let seeded = !seed.is_empty();
                (seed, false, seeded)
            }
            None => (Vec::new(), true, false),
        };
        info!(
            source = D::KEY,
            cached = records.len(),
            enabled = config.enabled,
            "Data source initialized"
        );

        Ok(Self {
            config,
            fetcher,
            cache,
            events,
            state: RwLock::new(SourceState {
                records,
                loading,
                live: false,
                seeded,
                criteria: D::Criteria::default(),
                last_success: None,
            }),
            in_flight: AtomicBool::new(false),
            last_cycle: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Whether a fetch cycle is running right now
    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one fetch cycle starting now
    pub async fn run_cycle(&self, trigger: Trigger) -> CycleOutcome {
        self.run_cycle_at(trigger, Instant::now()).await
    }

    /// Run one fetch cycle whose logical start is `started`
    ///
    /// Scheduled cycles pass the tick's deadline so the cooldown compares
    /// schedule instants rather than wake-up times.
    pub async fn run_cycle_at(&self, trigger: Trigger, started: Instant) -> CycleOutcome {
        if !self.config.enabled {
            return CycleOutcome::Skipped {
                reason: SkipReason::Disabled,
            };
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(source = D::KEY, ?trigger, "Fetch already in flight, skipping");
            return CycleOutcome::Skipped {
                reason: SkipReason::InFlight,
            };
        }
        let _guard = InFlightGuard(&self.in_flight);

        {
            let mut last = self.last_cycle.lock().await;
            let cooling = match *last {
                Some(previous) if trigger == Trigger::Scheduled => {
                    started.saturating_duration_since(previous) < self.config.cooldown
                }
                _ => false,
            };
            if cooling {
                debug!(source = D::KEY, ?trigger, "Within cooldown, skipping");
                return CycleOutcome::Skipped {
                    reason: SkipReason::Cooldown,
                };
            }
            *last = Some(started);
        }

        match self.fetcher.fetch::<D>(&self.config.candidates).await {
            Ok(fetched) => self.apply_live(fetched).await,
            Err(e) => self.apply_degraded(e).await,
        }
    }

    async fn apply_live(&self, fetched: Fetched<D::Record>) -> CycleOutcome {
        let Fetched { records, candidate } = fetched;
        let count = records.len();
        let now = dash_common::time::now();

        if let Err(e) = self.cache.set(&self.config.cache_key, &records, self.config.cache_ttl) {
            warn!(source = D::KEY, error = %e, "Failed to cache fetched records");
        }

        {
            let mut state = self.state.write().await;
            state.records = records;
            state.loading = false;
            state.live = true;
            state.seeded = false;
            state.last_success = Some(now);
        }

        self.events.emit_lossy(DashEvent::SourceRefreshed {
            source: D::KEY.to_string(),
            records: count,
            candidate,
            timestamp: now,
        });

        CycleOutcome::Live {
            records: count,
            candidate,
        }
    }

    async fn apply_degraded(&self, error: FetchError) -> CycleOutcome {
        let attempts = error.attempts();

        let fallback = {
            let mut state = self.state.write().await;
            let fallback = if state.seeded {
                Fallback::Seed
            } else if !state.records.is_empty() {
                Fallback::Retained
            } else {
                state.records = D::seed();
                state.seeded = !state.records.is_empty();
                if state.seeded {
                    Fallback::Seed
                } else {
                    Fallback::Empty
                }
            };
            state.live = false;
            state.loading = false;
            fallback
        };

        warn!(
            source = D::KEY,
            attempts,
            fallback = fallback.as_str(),
            error = %error,
            "All candidates failed, serving fallback data"
        );

        self.events.emit_lossy(DashEvent::SourceDegraded {
            source: D::KEY.to_string(),
            attempts,
            fallback: fallback.as_str().to_string(),
            timestamp: dash_common::time::now(),
        });

        CycleOutcome::Degraded { attempts, fallback }
    }

    async fn snapshot(&self) -> (Snapshot<D>, D::Criteria) {
        let state = self.state.read().await;
        (
            Snapshot {
                records: state.records.clone(),
                loading: state.loading,
                live: state.live,
                last_refreshed: state.last_success,
            },
            state.criteria.clone(),
        )
    }

    /// View under the stored criteria
    pub async fn view(&self) -> ViewOf<D> {
        let (snapshot, criteria) = self.snapshot().await;
        snapshot.into_view(criteria)
    }

    /// View under ad-hoc criteria; the stored criteria stay as they are
    pub async fn query(&self, criteria: D::Criteria) -> ViewOf<D> {
        let (snapshot, _) = self.snapshot().await;
        snapshot.into_view(criteria)
    }

    /// Replace the stored criteria and return the resulting view
    pub async fn set_criteria(&self, criteria: D::Criteria) -> ViewOf<D> {
        let changed = {
            let mut state = self.state.write().await;
            let changed = state.criteria != criteria;
            state.criteria = criteria;
            changed
        };
        if changed {
            self.events.emit_lossy(DashEvent::CriteriaChanged {
                source: D::KEY.to_string(),
                timestamp: dash_common::time::now(),
            });
        }
        self.view().await
    }

    pub async fn criteria(&self) -> D::Criteria {
        self.state.read().await.criteria.clone()
    }

    pub async fn records(&self) -> Vec<D::Record> {
        self.state.read().await.records.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn is_using_live_data(&self) -> bool {
        self.state.read().await.live
    }

    pub async fn status(&self) -> SourceStatus {
        let state = self.state.read().await;
        SourceStatus {
            key: D::KEY,
            records: state.records.len(),
            loading: state.loading,
            is_using_live_data: state.live,
            last_refreshed: state.last_success,
            stale: self.cache.is_stale(&self.config.cache_key),
            enabled: self.config.enabled,
            fetching: self.is_fetching(),
        }
    }

    /// Run the initial cycle, then poll on the configured period
    ///
    /// The returned handle stops the schedule when dropped.
    pub fn start(self: Arc<Self>) -> PollHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = self.config.poll_interval;

        info!(source = D::KEY, period_secs = period.as_secs_f64(), "Starting poller");

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let outcome = self.run_cycle_at(Trigger::Initial, start).await;
            debug!(source = D::KEY, ?outcome, "Initial cycle finished");

            let mut ticker = tokio::time::interval_at(start + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    deadline = ticker.tick() => {
                        let outcome = self.run_cycle_at(Trigger::Scheduled, deadline).await;
                        debug!(source = D::KEY, ?outcome, "Scheduled cycle finished");
                    }
                }
            }
            info!(source = D::KEY, "Poller stopped");
        });

        PollHandle {
            source: D::KEY,
            cancel,
            task: Some(task),
        }
    }
}

/// Running schedule of one source
pub struct PollHandle {
    source: &'static str,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Stop scheduling further cycles; a running cycle completes
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop and wait for the polling task to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(source = self.source, error = %e, "Poller task ended abnormally");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::{Marketing, Sales};
    use std::time::Duration;

    fn unreachable_config<D: Domain>() -> SourceConfig {
        // Nothing listens on the discard port
        let mut config = D::default_config();
        config.candidates = vec!["http://127.0.0.1:9/export.csv".to_string()];
        config.request_timeout = Some(Duration::from_secs(2));
        config
    }

    fn make_source<D: Domain>(config: SourceConfig, cache: Arc<CacheStore>) -> PollingDataSource<D> {
        PollingDataSource::new(config, cache, EventBus::new(16)).unwrap()
    }

    #[tokio::test]
    async fn test_cold_start_is_loading_and_not_live() {
        let source = make_source::<Sales>(unreachable_config::<Sales>(), Arc::new(CacheStore::in_memory()));
        assert!(source.is_loading().await);
        assert!(!source.is_using_live_data().await);
        assert!(source.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_cached_records_shown_instantly() {
        let cache = Arc::new(CacheStore::in_memory());
        let seed = Marketing::seed();
        cache.set("marketing_data", &seed, Duration::from_secs(60)).unwrap();

        let source = make_source::<Marketing>(unreachable_config::<Marketing>(), cache);
        assert!(!source.is_loading().await);
        assert!(!source.is_using_live_data().await);
        assert_eq!(source.records().await, seed);
    }

    #[tokio::test]
    async fn test_exhaustion_without_records_uses_seed() {
        let source = make_source::<Marketing>(unreachable_config::<Marketing>(), Arc::new(CacheStore::in_memory()));
        let outcome = source.run_cycle(Trigger::Initial).await;
        assert_eq!(
            outcome,
            CycleOutcome::Degraded {
                attempts: 1,
                fallback: Fallback::Seed
            }
        );
        assert_eq!(source.records().await, Marketing::seed());
        assert!(!source.is_loading().await);
        assert!(!source.is_using_live_data().await);
    }

    #[tokio::test]
    async fn test_exhaustion_without_seed_is_empty() {
        let source = make_source::<Sales>(unreachable_config::<Sales>(), Arc::new(CacheStore::in_memory()));
        let outcome = source.run_cycle(Trigger::Initial).await;
        assert_eq!(
            outcome,
            CycleOutcome::Degraded {
                attempts: 1,
                fallback: Fallback::Empty
            }
        );
        assert!(!source.is_loading().await);
    }

    #[tokio::test]
    async fn test_repeated_exhaustion_keeps_reporting_seed() {
        let source = make_source::<Marketing>(unreachable_config::<Marketing>(), Arc::new(CacheStore::in_memory()));
        source.run_cycle(Trigger::Initial).await;

        assert_eq!(
            source.run_cycle(Trigger::Manual).await,
            CycleOutcome::Degraded {
                attempts: 1,
                fallback: Fallback::Seed
            }
        );
        assert_eq!(source.records().await, Marketing::seed());
    }

    #[tokio::test]
    async fn test_cooldown_only_gates_scheduled_cycles() {
        let mut config = unreachable_config::<Sales>();
        config.cooldown = Duration::from_secs(60);
        let source = make_source::<Sales>(config, Arc::new(CacheStore::in_memory()));

        source.run_cycle(Trigger::Initial).await;
        assert_eq!(
            source.run_cycle(Trigger::Scheduled).await,
            CycleOutcome::Skipped {
                reason: SkipReason::Cooldown
            }
        );
        // Initial and manual cycles are exempt
        assert!(matches!(
            source.run_cycle(Trigger::Manual).await,
            CycleOutcome::Degraded { .. }
        ));
        assert!(matches!(
            source.run_cycle(Trigger::Initial).await,
            CycleOutcome::Degraded { .. }
        ));
    }

    #[tokio::test]
    async fn test_disabled_source_never_fetches() {
        let mut config = unreachable_config::<Marketing>();
        config.enabled = false;
        let source = make_source::<Marketing>(config, Arc::new(CacheStore::in_memory()));

        assert!(!source.is_loading().await);
        assert_eq!(source.records().await.len(), 3);
        assert_eq!(
            source.run_cycle(Trigger::Manual).await,
            CycleOutcome::Skipped {
                reason: SkipReason::Disabled
            }
        );
    }

    #[tokio::test]
    async fn test_set_criteria_emits_once_per_change() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let source = PollingDataSource::<Sales>::new(
            unreachable_config::<Sales>(),
            Arc::new(CacheStore::in_memory()),
            bus,
        )
        .unwrap();

        let mut criteria = source.criteria().await;
        criteria.regions = vec!["Europe".to_string()];
        source.set_criteria(criteria.clone()).await;
        source.set_criteria(criteria.clone()).await;

        assert!(matches!(rx.try_recv(), Ok(DashEvent::CriteriaChanged { .. })));
        assert!(rx.try_recv().is_err());
        assert_eq!(source.criteria().await, criteria);
    }

    #[tokio::test]
    async fn test_query_leaves_stored_criteria() {
        let source = make_source::<Marketing>(unreachable_config::<Marketing>(), Arc::new(CacheStore::in_memory()));
        source.run_cycle(Trigger::Initial).await;

        let mut criteria = source.criteria().await;
        criteria.search_query = "no such campaign anywhere".to_string();
        let view = source.query(criteria).await;

        assert!(view.data.is_empty());
        assert_eq!(view.raw_data.len(), 3);
        assert_eq!(source.criteria().await, Default::default());
    }

    #[tokio::test]
    async fn test_poll_handle_stop() {
        let source = Arc::new(make_source::<Sales>(unreachable_config::<Sales>(), Arc::new(CacheStore::in_memory())));
        let handle = Arc::clone(&source).start();
        assert_eq!(handle.source(), "sales");
        handle.stop();
        assert!(handle.is_stopped());
        handle.shutdown().await;
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(CycleOutcome::Skipped {
            reason: SkipReason::InFlight,
        })
        .unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "inFlight");

        let json = serde_json::to_value(CycleOutcome::Degraded {
            attempts: 2,
            fallback: Fallback::Retained,
        })
        .unwrap();
        assert_eq!(json["fallback"], "retained");
    }
}
