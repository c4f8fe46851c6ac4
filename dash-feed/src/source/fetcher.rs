//! Candidate-URL fetcher
//!
//! Tries each export URL of a source in order and returns the records of the
//! first one that yields a usable CSV body. Failures here are never surfaced
//! to clients; the poller turns them into the live flag and a fallback.

use crate::coerce::NormalizeContext;
use crate::domains::Domain;
use crate::filter::Record;
use dash_common::csv;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("dash-feed/", env!("CARGO_PKG_VERSION"));

/// Why a single candidate was rejected
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CandidateError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Body is an HTML page, not CSV")]
    HtmlBody,

    #[error("Too few usable lines ({0})")]
    TooFewLines(usize),

    #[error("No rows could be normalized")]
    NoRecords,
}

/// Whole-cycle fetch failure
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("All {attempts} candidate URLs failed")]
    Exhausted { attempts: usize },
}

impl FetchError {
    /// Number of candidates tried before giving up
    pub fn attempts(&self) -> usize {
        match self {
            FetchError::Client(_) => 0,
            FetchError::Exhausted { attempts } => *attempts,
        }
    }
}

/// Records from the first candidate that answered
#[derive(Debug, Clone)]
pub struct Fetched<R> {
    pub records: Vec<R>,
    /// Index of the winning candidate
    pub candidate: usize,
}

/// HTTP side of a data source
pub struct SourceFetcher {
    http_client: Client,
}

impl SourceFetcher {
    /// Build the client; `timeout` of `None` leaves requests unbounded
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Try `candidates` in order, stopping at the first usable one
    pub async fn fetch<D: Domain>(
        &self,
        candidates: &[String],
    ) -> Result<Fetched<D::Record>, FetchError> {
        for (index, url) in candidates.iter().enumerate() {
            match self.try_candidate::<D>(url).await {
                Ok(records) => {
                    info!(
                        source = D::KEY,
                        candidate = index,
                        records = records.len(),
                        "Fetched source data"
                    );
                    return Ok(Fetched {
                        records,
                        candidate: index,
                    });
                }
                Err(e) => {
                    debug!(source = D::KEY, candidate = index, url = %url, error = %e, "Candidate rejected");
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts: candidates.len(),
        })
    }

    async fn try_candidate<D: Domain>(&self, url: &str) -> Result<Vec<D::Record>, CandidateError> {
        debug!(source = D::KEY, url = %url, "Requesting candidate");

        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, "text/csv")
            .send()
            .await
            .map_err(|e| CandidateError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CandidateError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CandidateError::Transport(e.to_string()))?;

        let ctx = NormalizeContext::new(dash_common::time::now());
        decode_body::<D>(&body, &ctx)
    }
}

/// Login and interstitial pages come back as 200 with an HTML body
pub fn looks_like_html(body: &str) -> bool {
    body.contains("<!DOCTYPE") || body.contains("<html")
}

/// Validate, parse and normalize one response body
///
/// Row indices passed to the normalizer count every parsed data row, so
/// placeholder ids stay stable even when earlier rows are dropped.
pub fn decode_body<D: Domain>(
    body: &str,
    ctx: &NormalizeContext,
) -> Result<Vec<D::Record>, CandidateError> {
    if looks_like_html(body) {
        return Err(CandidateError::HtmlBody);
    }

    let usable = csv::usable_lines(body);
    if usable < 2 {
        return Err(CandidateError::TooFewLines(usable));
    }

    let records: Vec<D::Record> = csv::parse_text(body)
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| D::normalize(raw, index, ctx))
        .filter(|record| !record.id().trim().is_empty())
        .collect();

    if records.is_empty() {
        return Err(CandidateError::NoRecords);
    }
    Ok(records)
}
