//! Analysis run configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! start = "2024-01-01"
//! output_dir = "results_stock_analysis"
//! profile = "full"
//! workers = 4
//!
//! [source]
//! kind = "csv"
//! csv_dir = "data/prices"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use techscan_core::data::{
    CsvDirFetcher, SeriesFetcher, SyntheticFetcher, YahooFetcher, DEFAULT_MIN_HISTORY,
};
use techscan_core::engine::IndicatorProfile;

pub const DEFAULT_OUTPUT_DIR: &str = "results_stock_analysis";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("parsing config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("building fetcher: {0}")]
    Fetcher(String),
}

/// Where price history comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Yahoo,
    Csv,
    Synthetic,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Yahoo => "yahoo",
            SourceKind::Csv => "csv",
            SourceKind::Synthetic => "synthetic",
        }
    }
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(SourceKind::Yahoo),
            "csv" => Ok(SourceKind::Csv),
            "synthetic" => Ok(SourceKind::Synthetic),
            other => Err(ConfigError::Invalid(format!(
                "unknown source '{other}' (expected yahoo, csv or synthetic)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Directory of `{TICKER}.csv` files, required when `kind = "csv"`.
    pub csv_dir: Option<PathBuf>,
    /// Seed for the synthetic source.
    pub seed: u64,
    /// Retries on transient HTTP failures, Yahoo only.
    pub max_retries: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Yahoo,
            csv_dir: None,
            seed: 42,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub start: NaiveDate,
    /// Inclusive end date; today when absent.
    pub end: Option<NaiveDate>,
    pub output_dir: PathBuf,
    pub profile: IndicatorProfile,
    /// Pipeline workers. 1 runs tickers sequentially.
    pub workers: usize,
    pub min_history: usize,
    pub fetch_timeout_secs: u64,
    pub sink_timeout_secs: u64,
    pub render_charts: bool,
    pub source: SourceConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            end: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            profile: IndicatorProfile::Full,
            workers: 1,
            min_history: DEFAULT_MIN_HISTORY,
            fetch_timeout_secs: 60,
            sink_timeout_secs: 60,
            render_charts: true,
            source: SourceConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.min_history == 0 {
            return Err(ConfigError::Invalid("min_history must be at least 1".into()));
        }
        if self.fetch_timeout_secs == 0 || self.sink_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        if let Some(end) = self.end {
            if end < self.start {
                return Err(ConfigError::Invalid(format!(
                    "end {end} is before start {}",
                    self.start
                )));
            }
        }
        if self.source.kind == SourceKind::Csv && self.source.csv_dir.is_none() {
            return Err(ConfigError::Invalid(
                "source.csv_dir is required when source.kind = \"csv\"".into(),
            ));
        }
        Ok(())
    }

    /// End date, resolving an open end to `today`.
    pub fn end_or(&self, today: NaiveDate) -> NaiveDate {
        self.end.unwrap_or(today)
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_or(chrono::Local::now().date_naive())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_secs)
    }

    pub fn build_fetcher(&self) -> Result<Arc<dyn SeriesFetcher>, ConfigError> {
        match self.source.kind {
            SourceKind::Yahoo => {
                let fetcher = YahooFetcher::bounded(
                    self.fetch_timeout(),
                    self.source.max_retries,
                    Duration::from_millis(500),
                )
                .map_err(|e| ConfigError::Fetcher(e.to_string()))?;
                Ok(Arc::new(fetcher))
            }
            SourceKind::Csv => {
                let dir = self.source.csv_dir.clone().ok_or_else(|| {
                    ConfigError::Invalid("source.csv_dir is required for csv".into())
                })?;
                Ok(Arc::new(CsvDirFetcher::new(dir)))
            }
            SourceKind::Synthetic => Ok(Arc::new(SyntheticFetcher::new(self.source.seed))),
        }
    }
}
