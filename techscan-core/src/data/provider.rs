//! Series fetcher trait and structured error types.
//!
//! The SeriesFetcher trait abstracts over data sources (Yahoo Finance, a CSV
//! directory, synthetic data) so implementations can be swapped and mocked in
//! tests.

use crate::domain::RawSeries;
use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

/// Structured fetch errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The provider has nothing for this ticker and range.
    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("fetch error: {0}")]
    Other(String),
}

impl FetchError {
    pub fn no_data(ticker: &str) -> Self {
        FetchError::NoData {
            ticker: ticker.to_string(),
        }
    }
}

/// Source of raw daily price tables.
///
/// Implementations return the table as delivered: columns may be textual or
/// contain nulls. Validation happens downstream.
pub trait SeriesFetcher: Send + Sync {
    /// Human-readable name of this fetcher.
    fn name(&self) -> &str;

    /// Fetch daily rows for `ticker` with dates in `start..=end`.
    ///
    /// An empty result must be reported as [`FetchError::NoData`].
    fn fetch(&self, ticker: &str, start: NaiveDate, end: NaiveDate)
        -> Result<RawSeries, FetchError>;
}
