//! Price series at the two ends of the data path.
//!
//! - [`RawSeries`]: whatever the fetcher returned, as a polars `DataFrame`.
//!   Values may be floats, integers or text, and may be null.
//! - [`CleanSeries`]: validated, date-ordered, gap-free f64 columns. Only the
//!   cleaner can build one, so holding a `CleanSeries` means the invariants hold.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Name of the date column in every raw frame.
pub const DATE_COLUMN: &str = "Date";

/// One of the per-bar numeric fields a fetcher delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl PriceField {
    pub const ALL: [PriceField; 5] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::Volume,
    ];

    /// Column name in raw and persisted tables.
    pub fn column(&self) -> &'static str {
        match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
            PriceField::Volume => "Volume",
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Inputs that cannot be treated as equal-length one-dimensional f64 arrays.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("column '{column}' is not one-dimensional (dtype {dtype})")]
    Nested { column: String, dtype: String },
}

/// Raw daily table for one ticker, exactly as the fetcher produced it.
#[derive(Debug, Clone)]
pub struct RawSeries {
    ticker: String,
    frame: DataFrame,
}

impl RawSeries {
    pub fn new(ticker: impl Into<String>, frame: DataFrame) -> Self {
        Self {
            ticker: ticker.into(),
            frame,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_names().iter().any(|c| c.as_str() == name)
    }
}

/// A validated, gap-filled daily series.
///
/// Invariants: all columns have the same length, dates are strictly
/// increasing, every value is finite, and there are at least as many rows as
/// the cleaner's minimum history.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanSeries {
    ticker: String,
    dates: Vec<NaiveDate>,
    open: Option<Vec<f64>>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
}

impl CleanSeries {
    /// Callers must uphold the type's invariants.
    pub(crate) fn from_parts(
        ticker: String,
        dates: Vec<NaiveDate>,
        open: Option<Vec<f64>>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Self {
        debug_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(
            [high.len(), low.len(), close.len(), volume.len()]
                .iter()
                .all(|&n| n == dates.len())
        );
        Self {
            ticker,
            dates,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn open(&self) -> Option<&[f64]> {
        self.open.as_deref()
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    /// Values of one field, if the series carries it.
    pub fn field(&self, field: PriceField) -> Option<&[f64]> {
        match field {
            PriceField::Open => self.open(),
            PriceField::High => Some(&self.high),
            PriceField::Low => Some(&self.low),
            PriceField::Close => Some(&self.close),
            PriceField::Volume => Some(&self.volume),
        }
    }

    /// Build a polars frame with a string `Date` column followed by the price
    /// fields. Used to feed a clean series back through the data path.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let dates: Vec<String> = self
            .dates
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect();
        let mut columns: Vec<Column> = vec![Column::from(Series::new(DATE_COLUMN.into(), dates))];
        if let Some(open) = &self.open {
            columns.push(Column::from(Series::new("Open".into(), open.as_slice())));
        }
        columns.push(Column::from(Series::new("High".into(), self.high.as_slice())));
        columns.push(Column::from(Series::new("Low".into(), self.low.as_slice())));
        columns.push(Column::from(Series::new("Close".into(), self.close.as_slice())));
        columns.push(Column::from(Series::new("Volume".into(), self.volume.as_slice())));
        DataFrame::new(columns)
    }
}

impl TryFrom<&CleanSeries> for RawSeries {
    type Error = PolarsError;

    fn try_from(series: &CleanSeries) -> Result<Self, Self::Error> {
        Ok(RawSeries::new(series.ticker.clone(), series.to_frame()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> CleanSeries {
        let d0 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        CleanSeries::from_parts(
            "TEST".into(),
            vec![d0, d0.succ_opt().unwrap()],
            None,
            vec![2.0, 3.0],
            vec![1.0, 2.0],
            vec![1.5, 2.5],
            vec![100.0, 200.0],
        )
    }

    #[test]
    fn field_lookup_matches_accessors() {
        let s = tiny();
        assert_eq!(s.field(PriceField::Close), Some(&[1.5, 2.5][..]));
        assert_eq!(s.field(PriceField::Open), None);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn to_frame_has_date_first() {
        let s = tiny();
        let df = s.to_frame().unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["Date", "High", "Low", "Close", "Volume"]);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn raw_series_reports_columns() {
        let raw = RawSeries::try_from(&tiny()).unwrap();
        assert_eq!(raw.ticker(), "TEST");
        assert!(raw.has_column("Volume"));
        assert!(!raw.has_column("Open"));
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn price_field_column_names() {
        let names: Vec<&str> = PriceField::ALL.iter().map(|f| f.column()).collect();
        assert_eq!(names, vec!["Open", "High", "Low", "Close", "Volume"]);
    }
}
