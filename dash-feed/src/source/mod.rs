//! Data sources: fetching, polling and read-side views

pub mod fetcher;
pub mod poller;
pub mod view;

pub use fetcher::{CandidateError, FetchError, SourceFetcher};
pub use poller::{CycleOutcome, Fallback, PollHandle, PollingDataSource, SkipReason, Trigger};
pub use view::{DomainView, SourceStatus, ViewOf};
