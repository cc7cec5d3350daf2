//! Per-ticker analysis pipeline.
//!
//! One run walks `Fetching → Validating → Cleaning → Computing → Persisting →
//! Done`. Any stage can end the run in `Failed(reason)`. Every error is caught
//! here and turned into a [`PipelineOutcome`]; nothing propagates to the
//! caller, and nothing is retried.
//!
//! Fetch and sink calls are bounded by timeouts. A chart failure is recorded
//! on the outcome but does not fail the ticker once the table is accepted.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use techscan_core::data::{
    CleanError, FetchError, SeriesCleaner, SeriesFetcher, SeriesValidator, ValidationError,
};
use techscan_core::domain::{
    AnalysisResult, Category, CleanSeries, IndicatorSet, Omission, RawSeries, ShapeError,
};
use techscan_core::engine::IndicatorEngine;

use crate::config::AnalysisConfig;
use crate::sink::{Ack, ResultSink, SinkError};
use crate::timeout::{call_with_timeout, TimeoutError};

/// Why a ticker failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "detail")]
pub enum FailureReason {
    #[error("no data")]
    NoData,

    #[error("fetch timed out after {millis}ms")]
    FetchTimeout { millis: u64 },

    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("data quality error: {0}")]
    DataQualityError(String),

    #[error("insufficient history: {available} rows, need {required}")]
    InsufficientHistoryError { available: usize, required: usize },

    #[error("shape error: {0}")]
    ShapeError(String),

    #[error("sink error: {0}")]
    SinkError(String),
}

impl FailureReason {
    fn fetch_timeout(limit: Duration) -> Self {
        FailureReason::FetchTimeout {
            millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FailureReason::NoData => "NoData",
            FailureReason::FetchTimeout { .. } => "FetchTimeout",
            FailureReason::FetchFailed(_) => "FetchFailed",
            FailureReason::SchemaError(_) => "SchemaError",
            FailureReason::DataQualityError(_) => "DataQualityError",
            FailureReason::InsufficientHistoryError { .. } => "InsufficientHistoryError",
            FailureReason::ShapeError(_) => "ShapeError",
            FailureReason::SinkError(_) => "SinkError",
        }
    }
}

impl From<FetchError> for FailureReason {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::NoData { .. } => FailureReason::NoData,
            FetchError::Timeout(limit) => FailureReason::fetch_timeout(limit),
            other => FailureReason::FetchFailed(other.to_string()),
        }
    }
}

impl From<ValidationError> for FailureReason {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::Shape(shape) => shape.into(),
            e if e.is_schema() => FailureReason::SchemaError(e.to_string()),
            e => FailureReason::DataQualityError(e.to_string()),
        }
    }
}

impl From<CleanError> for FailureReason {
    fn from(e: CleanError) -> Self {
        match e {
            CleanError::InsufficientHistory {
                available,
                required,
            } => FailureReason::InsufficientHistoryError {
                available,
                required,
            },
            other => FailureReason::DataQualityError(other.to_string()),
        }
    }
}

impl From<ShapeError> for FailureReason {
    fn from(e: ShapeError) -> Self {
        FailureReason::ShapeError(e.to_string())
    }
}

impl From<SinkError> for FailureReason {
    fn from(e: SinkError) -> Self {
        FailureReason::SinkError(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum PipelineState {
    Fetching,
    Validating,
    Cleaning,
    Computing,
    Persisting,
    Done,
    Failed(FailureReason),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Fetching => "Fetching",
            PipelineState::Validating => "Validating",
            PipelineState::Cleaning => "Cleaning",
            PipelineState::Computing => "Computing",
            PipelineState::Persisting => "Persisting",
            PipelineState::Done => "Done",
            PipelineState::Failed(_) => "Failed",
        }
    }
}

/// Record of one ticker's run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub ticker: String,
    pub category: Category,
    /// Terminal state.
    pub state: PipelineState,
    /// Non-terminal states entered, in order.
    pub trail: Vec<PipelineState>,
    /// Rows in the clean series, 0 when cleaning was not reached.
    pub rows: usize,
    pub omitted: Vec<Omission>,
    pub table: Option<Ack>,
    pub chart: Option<Ack>,
    pub chart_error: Option<String>,
}

impl PipelineOutcome {
    fn new(ticker: &str, category: Category) -> Self {
        Self {
            ticker: ticker.to_string(),
            category,
            state: PipelineState::Fetching,
            trail: Vec::new(),
            rows: 0,
            omitted: Vec::new(),
            table: None,
            chart: None,
            chart_error: None,
        }
    }

    fn enter(&mut self, state: PipelineState) {
        debug!(ticker = %self.ticker, state = state.name(), "pipeline stage");
        self.trail.push(state.clone());
        self.state = state;
    }

    pub fn is_done(&self) -> bool {
        self.state == PipelineState::Done
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        match &self.state {
            PipelineState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn reached(&self, state: &PipelineState) -> bool {
        self.trail.contains(state)
    }

    /// BLAKE3 digest of the persisted table, when one was accepted.
    pub fn table_digest(&self) -> Option<&str> {
        self.table.as_ref().map(|ack| ack.digest.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub min_history: usize,
    pub fetch_timeout: Duration,
    pub sink_timeout: Duration,
    pub render_charts: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            start: config.start,
            end: config.end_date(),
            min_history: config.min_history,
            fetch_timeout: config.fetch_timeout(),
            sink_timeout: config.sink_timeout(),
            render_charts: config.render_charts,
        }
    }
}

pub struct AnalysisPipeline {
    fetcher: Arc<dyn SeriesFetcher>,
    sink: Arc<dyn ResultSink>,
    validator: SeriesValidator,
    cleaner: SeriesCleaner,
    engine: IndicatorEngine,
    options: PipelineOptions,
}

impl std::fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("fetcher", &self.fetcher.name())
            .field("sink", &self.sink.name())
            .field("engine", &self.engine)
            .field("options", &self.options)
            .finish()
    }
}

impl AnalysisPipeline {
    pub fn new(
        fetcher: Arc<dyn SeriesFetcher>,
        sink: Arc<dyn ResultSink>,
        engine: IndicatorEngine,
        options: PipelineOptions,
    ) -> Self {
        Self {
            validator: SeriesValidator::new(&engine.required_sources()),
            cleaner: SeriesCleaner::new(options.min_history),
            fetcher,
            sink,
            engine,
            options,
        }
    }

    pub fn from_config(
        config: &AnalysisConfig,
        fetcher: Arc<dyn SeriesFetcher>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self::new(
            fetcher,
            sink,
            IndicatorEngine::for_profile(config.profile),
            PipelineOptions::from_config(config),
        )
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn engine(&self) -> &IndicatorEngine {
        &self.engine
    }

    /// Run one ticker to a terminal state.
    pub fn run(&self, ticker: &str, category: Category) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::new(ticker, category);
        match self.drive(&mut outcome) {
            Ok(()) => {
                outcome.state = PipelineState::Done;
                info!(
                    ticker,
                    category = %category,
                    rows = outcome.rows,
                    omitted = outcome.omitted.len(),
                    "analysis done"
                );
            }
            Err(reason) => {
                warn!(
                    ticker,
                    category = %category,
                    stage = outcome.state.name(),
                    reason = %reason,
                    "analysis failed"
                );
                outcome.state = PipelineState::Failed(reason);
            }
        }
        outcome
    }

    fn drive(&self, outcome: &mut PipelineOutcome) -> Result<(), FailureReason> {
        let ticker = outcome.ticker.clone();

        outcome.enter(PipelineState::Fetching);
        let raw = self.fetch(&ticker)?;

        outcome.enter(PipelineState::Validating);
        let validated = self.validator.validate(&raw)?;

        outcome.enter(PipelineState::Cleaning);
        let clean: CleanSeries = self.cleaner.clean(validated)?;
        outcome.rows = clean.len();

        outcome.enter(PipelineState::Computing);
        let indicators: IndicatorSet = self.engine.compute(&clean)?;
        outcome.omitted = indicators.omitted().to_vec();

        outcome.enter(PipelineState::Persisting);
        let result = Arc::new(AnalysisResult::new(outcome.category, clean, indicators));
        let table = self
            .persist(&result, "table", |sink, r| sink.write_table(r))
            .map_err(|e| FailureReason::SinkError(e.to_string()))?;
        outcome.table = Some(table);

        if self.options.render_charts {
            match self.persist(&result, "chart", |sink, r| sink.write_chart(r)) {
                Ok(ack) => outcome.chart = Some(ack),
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "chart not written");
                    outcome.chart_error = Some(e.to_string());
                }
            }
        }
        Ok(())
    }

    fn fetch(&self, ticker: &str) -> Result<RawSeries, FailureReason> {
        let fetcher = Arc::clone(&self.fetcher);
        let owned = ticker.to_string();
        let (start, end) = (self.options.start, self.options.end);
        let limit = self.options.fetch_timeout;

        let raw = match call_with_timeout(&format!("fetch-{ticker}"), limit, move || {
            fetcher.fetch(&owned, start, end)
        }) {
            Ok(result) => result?,
            Err(TimeoutError::Elapsed(limit)) => {
                return Err(FailureReason::fetch_timeout(limit))
            }
            Err(other) => return Err(FailureReason::FetchFailed(other.to_string())),
        };

        if raw.is_empty() {
            return Err(FailureReason::NoData);
        }
        Ok(raw)
    }

    fn persist<F>(
        &self,
        result: &Arc<AnalysisResult>,
        what: &str,
        write: F,
    ) -> Result<Ack, SinkError>
    where
        F: FnOnce(&dyn ResultSink, &AnalysisResult) -> Result<Ack, SinkError> + Send + 'static,
    {
        let sink = Arc::clone(&self.sink);
        let result = Arc::clone(result);
        let name = format!("{what}-{}", result.ticker());
        match call_with_timeout(&name, self.options.sink_timeout, move || {
            write(sink.as_ref(), &result)
        }) {
            Ok(written) => written,
            Err(e) => Err(SinkError::Rejected(format!("{what} write: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::test_support::{options, StubFetcher};
    use techscan_core::data::SyntheticFetcher;

    fn pipeline(fetcher: Arc<dyn SeriesFetcher>, sink: Arc<MemorySink>) -> AnalysisPipeline {
        AnalysisPipeline::new(fetcher, sink, IndicatorEngine::standard(), options())
    }

    #[test]
    fn synthetic_ticker_reaches_done() {
        let sink = Arc::new(MemorySink::new());
        let outcome = pipeline(Arc::new(SyntheticFetcher::new(1)), sink.clone())
            .run("SPY", Category::Etf);

        assert!(outcome.is_done(), "{:?}", outcome.state);
        assert_eq!(
            outcome.trail,
            vec![
                PipelineState::Fetching,
                PipelineState::Validating,
                PipelineState::Cleaning,
                PipelineState::Computing,
                PipelineState::Persisting,
            ]
        );
        assert!(outcome.omitted.is_empty());
        assert!(outcome.table.is_some());
        assert!(outcome.chart.is_some());
        assert!(sink.table(Category::Etf, "SPY").is_some());
    }

    #[test]
    fn no_data_fails_in_fetching() {
        let sink = Arc::new(MemorySink::new());
        let outcome =
            pipeline(Arc::new(StubFetcher::no_data()), sink.clone()).run("NOPE", Category::Stock);
        assert_eq!(outcome.state, PipelineState::Failed(FailureReason::NoData));
        assert_eq!(outcome.trail, vec![PipelineState::Fetching]);
        assert_eq!(sink.table_count(), 0);
    }

    #[test]
    fn short_history_never_reaches_computing() {
        let sink = Arc::new(MemorySink::new());
        let outcome =
            pipeline(Arc::new(StubFetcher::rows(12)), sink).run("SHORT", Category::Stock);
        assert_eq!(
            outcome.reason(),
            Some(&FailureReason::InsufficientHistoryError {
                available: 12,
                required: 20
            })
        );
        assert!(outcome.reached(&PipelineState::Cleaning));
        assert!(!outcome.reached(&PipelineState::Computing));
    }

    #[test]
    fn missing_column_is_schema_error() {
        let sink = Arc::new(MemorySink::new());
        let outcome = pipeline(Arc::new(StubFetcher::without_volume(30)), sink)
            .run("NOVOL", Category::Etf);
        assert_eq!(outcome.reason().map(FailureReason::kind), Some("SchemaError"));
    }

    #[test]
    fn list_close_is_shape_error() {
        let sink = Arc::new(MemorySink::new());
        let outcome = pipeline(Arc::new(StubFetcher::nested_close(30)), sink.clone())
            .run("LIST", Category::Stock);
        assert_eq!(outcome.reason().map(FailureReason::kind), Some("ShapeError"));
        assert_eq!(
            outcome.trail,
            vec![PipelineState::Fetching, PipelineState::Validating]
        );
        assert_eq!(sink.table_count(), 0);
    }

    #[test]
    fn chart_failure_still_done() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_charts(true);
        let outcome = pipeline(Arc::new(SyntheticFetcher::new(2)), sink.clone())
            .run("QQQ", Category::Etf);
        assert!(outcome.is_done());
        assert!(outcome.chart.is_none());
        assert!(outcome.chart_error.is_some());
        assert_eq!(sink.table_count(), 1);
    }

    #[test]
    fn table_failure_is_sink_error() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_tables(true);
        let outcome =
            pipeline(Arc::new(SyntheticFetcher::new(2)), sink).run("QQQ", Category::Etf);
        assert_eq!(outcome.reason().map(FailureReason::kind), Some("SinkError"));
    }

    #[test]
    fn hung_fetch_is_fetch_timeout() {
        let sink = Arc::new(MemorySink::new());
        let mut opts = options();
        opts.fetch_timeout = Duration::from_millis(50);
        let p = AnalysisPipeline::new(
            Arc::new(StubFetcher::hanging(Duration::from_secs(2))),
            sink,
            IndicatorEngine::standard(),
            opts,
        );
        let outcome = p.run("HANG", Category::Etf);
        assert_eq!(
            outcome.reason(),
            Some(&FailureReason::FetchTimeout { millis: 50 })
        );
        assert_eq!(
            outcome.reason().map(ToString::to_string).as_deref(),
            Some("fetch timed out after 50ms")
        );
    }

    #[test]
    fn hung_sink_is_sink_error() {
        let sink = Arc::new(MemorySink::new().with_delay(Duration::from_secs(2)));
        let mut opts = options();
        opts.sink_timeout = Duration::from_millis(50);
        let p = AnalysisPipeline::new(
            Arc::new(SyntheticFetcher::new(3)),
            sink,
            IndicatorEngine::standard(),
            opts,
        );
        let outcome = p.run("SLOW", Category::Etf);
        assert_eq!(outcome.reason().map(FailureReason::kind), Some("SinkError"));
    }

    #[test]
    fn reason_mapping() {
        assert_eq!(
            FailureReason::from(FetchError::no_data("X")),
            FailureReason::NoData
        );
        assert_eq!(
            FailureReason::from(FetchError::Timeout(Duration::from_secs(60))),
            FailureReason::FetchTimeout { millis: 60_000 }
        );
        assert_eq!(
            FailureReason::from(FetchError::NetworkUnreachable("dns".into())).kind(),
            "FetchFailed"
        );
        let non_numeric = ValidationError::NonNumeric {
            column: "Volume".into(),
            row: 3,
            token: "abc".into(),
        };
        assert_eq!(FailureReason::from(non_numeric).kind(), "DataQualityError");
        assert_eq!(
            FailureReason::from(CleanError::PersistentGap {
                column: "Close".into()
            })
            .kind(),
            "DataQualityError"
        );
    }

    #[test]
    fn outcome_serializes_with_tagged_state() {
        let mut outcome = PipelineOutcome::new("SPY", Category::Etf);
        outcome.state = PipelineState::Failed(FailureReason::InsufficientHistoryError {
            available: 5,
            required: 20,
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["state"]["state"], "Failed");
        assert_eq!(json["state"]["reason"]["kind"], "InsufficientHistoryError");
        assert_eq!(json["state"]["reason"]["detail"]["available"], 5);
        assert_eq!(json["category"], "ETF");
    }
}
