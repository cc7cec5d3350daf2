//! Gap repair and date normalization.
//!
//! Steps, in order:
//! 1. Parse the date column; rows whose date cannot be parsed are dropped.
//! 2. Sort ascending by date (stable) and keep the first row of each date.
//! 3. Require at least `min_history` rows.
//! 4. Forward-fill, then backward-fill once, every numeric column.
//!
//! A column with no values at all cannot be filled and fails as a
//! persistent gap.

use super::validator::ValidatedSeries;
use crate::domain::CleanSeries;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

/// Default minimum number of rows a clean series must have.
pub const DEFAULT_MIN_HISTORY: usize = 20;

const DAY_KEY: &str = "__day";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanError {
    #[error("insufficient history: {available} rows, need {required}")]
    InsufficientHistory { available: usize, required: usize },

    #[error("column '{column}' is null on every row")]
    PersistentGap { column: String },

    #[error("reordering rows: {0}")]
    Frame(String),
}

impl From<PolarsError> for CleanError {
    fn from(e: PolarsError) -> Self {
        CleanError::Frame(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct SeriesCleaner {
    min_history: usize,
}

impl Default for SeriesCleaner {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_HISTORY)
    }
}

impl SeriesCleaner {
    pub fn new(min_history: usize) -> Self {
        Self { min_history }
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    pub fn clean(&self, series: ValidatedSeries) -> Result<CleanSeries, CleanError> {
        let total = series.len();
        let ordered = order_by_date(series)?;
        let dropped = total - ordered.dates.len();
        if dropped > 0 {
            debug!(
                ticker = %ordered.ticker,
                dropped, "dropped rows with unparseable or duplicate dates"
            );
        }

        let available = ordered.dates.len();
        if available < self.min_history {
            return Err(CleanError::InsufficientHistory {
                available,
                required: self.min_history,
            });
        }

        let open = match ordered.open {
            // An optional column with nothing in it is simply left out.
            Some(values) if values.iter().all(Option::is_none) => None,
            Some(values) => Some(fill_gaps("Open", values)?),
            None => None,
        };

        Ok(CleanSeries::from_parts(
            ordered.ticker,
            ordered.dates,
            open,
            fill_gaps("High", ordered.high)?,
            fill_gaps("Low", ordered.low)?,
            fill_gaps("Close", ordered.close)?,
            fill_gaps("Volume", ordered.volume)?,
        ))
    }
}

/// Rows after date parsing, sorting and de-duplication; gaps remain.
struct OrderedRows {
    ticker: String,
    dates: Vec<NaiveDate>,
    open: Option<Vec<Option<f64>>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Parse a date token. Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS[.fff]`,
/// the same with a `T` separator, and RFC 3339 timestamps.
pub fn parse_date(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    if let Ok(d) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(token, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(token)
        .ok()
        .map(|dt| dt.date_naive())
}

fn order_by_date(series: ValidatedSeries) -> Result<OrderedRows, CleanError> {
    let keep: Vec<(usize, NaiveDate)> = series
        .dates
        .iter()
        .enumerate()
        .filter_map(|(i, d)| d.as_deref().and_then(parse_date).map(|d| (i, d)))
        .collect();

    let pick = |values: &[Option<f64>]| -> Vec<Option<f64>> {
        keep.iter().map(|&(i, _)| values[i]).collect()
    };

    let mut columns = vec![
        Column::from(Series::new(
            DAY_KEY.into(),
            keep.iter().map(|&(_, d)| d.num_days_from_ce()).collect::<Vec<i32>>(),
        )),
        Column::from(Series::new("High".into(), pick(&series.high))),
        Column::from(Series::new("Low".into(), pick(&series.low))),
        Column::from(Series::new("Close".into(), pick(&series.close))),
        Column::from(Series::new("Volume".into(), pick(&series.volume))),
    ];
    if let Some(open) = &series.open {
        columns.push(Column::from(Series::new("Open".into(), pick(open))));
    }

    let frame = DataFrame::new(columns)?
        .lazy()
        .sort(
            [DAY_KEY],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .unique_stable(Some(vec![DAY_KEY.into()]), UniqueKeepStrategy::First)
        .collect()?;

    let days = frame.column(DAY_KEY)?.as_materialized_series().i32()?.clone();
    let dates = days
        .into_iter()
        .flatten()
        .filter_map(NaiveDate::from_num_days_from_ce_opt)
        .collect();

    let take = |name: &str| -> Result<Vec<Option<f64>>, CleanError> {
        Ok(frame
            .column(name)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .collect())
    };

    Ok(OrderedRows {
        ticker: series.ticker,
        dates,
        open: if series.open.is_some() {
            Some(take("Open")?)
        } else {
            None
        },
        high: take("High")?,
        low: take("Low")?,
        close: take("Close")?,
        volume: take("Volume")?,
    })
}

/// Forward-fill then backward-fill a column.
fn fill_gaps(column: &str, values: Vec<Option<f64>>) -> Result<Vec<f64>, CleanError> {
    let first = values
        .iter()
        .find_map(|v| *v)
        .ok_or_else(|| CleanError::PersistentGap {
            column: column.to_string(),
        })?;

    // Leading gaps take the first observed value (the backward fill);
    // everything after carries the last observed value forward.
    let mut last = first;
    Ok(values
        .into_iter()
        .map(|v| {
            if let Some(x) = v {
                last = x;
            }
            last
        })
        .collect())
}
