//! Schema and type validation at the fetcher boundary.
//!
//! Turns a [`RawSeries`] of arbitrary column types into typed optional
//! columns. Nulls survive validation (they are gaps for the cleaner); tokens
//! that are present but not numeric do not.

use crate::domain::{PriceField, RawSeries, ShapeError, DATE_COLUMN};
use polars::prelude::*;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("column '{column}' row {row}: '{token}' is not a number")]
    NonNumeric {
        column: String,
        row: usize,
        token: String,
    },

    #[error("column '{column}' has dtype {dtype}, which cannot be read as numbers")]
    UnsupportedDtype { column: String, dtype: String },

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error("reading column '{column}': {message}")]
    Frame { column: String, message: String },
}

impl ValidationError {
    /// True for failures of table structure rather than cell content.
    pub fn is_schema(&self) -> bool {
        matches!(self, ValidationError::MissingColumn { .. })
    }
}

/// Typed columns with gaps still present.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSeries {
    pub ticker: String,
    pub dates: Vec<Option<String>>,
    pub open: Option<Vec<Option<f64>>>,
    pub high: Vec<Option<f64>>,
    pub low: Vec<Option<f64>>,
    pub close: Vec<Option<f64>>,
    pub volume: Vec<Option<f64>>,
}

impl ValidatedSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SeriesValidator {
    required: Vec<PriceField>,
}

impl Default for SeriesValidator {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl SeriesValidator {
    /// Close, High, Low and Volume are always required; `extra` adds the
    /// sources an indicator set reads.
    pub fn new(extra: &[PriceField]) -> Self {
        let mut required = vec![
            PriceField::High,
            PriceField::Low,
            PriceField::Close,
            PriceField::Volume,
        ];
        required.extend_from_slice(extra);
        required.sort();
        required.dedup();
        Self { required }
    }

    pub fn required(&self) -> &[PriceField] {
        &self.required
    }

    pub fn validate(&self, raw: &RawSeries) -> Result<ValidatedSeries, ValidationError> {
        let frame = raw.frame();

        // Presence first, so a missing column is reported before any cell problem.
        for name in std::iter::once(DATE_COLUMN).chain(self.required.iter().map(|f| f.column())) {
            if frame.column(name).is_err() {
                return Err(ValidationError::MissingColumn {
                    column: name.to_string(),
                });
            }
        }

        let expected = frame.height();
        let dates = date_tokens(frame)?;

        let numeric = |field: PriceField| -> Result<Option<Vec<Option<f64>>>, ValidationError> {
            match frame.column(field.column()) {
                Ok(col) => {
                    let values = coerce_f64(field.column(), col.as_materialized_series())?;
                    if values.len() != expected {
                        return Err(ShapeError::LengthMismatch {
                            column: field.column().to_string(),
                            expected,
                            actual: values.len(),
                        }
                        .into());
                    }
                    Ok(Some(values))
                }
                Err(_) if !self.required.contains(&field) => Ok(None),
                Err(_) => Err(ValidationError::MissingColumn {
                    column: field.column().to_string(),
                }),
            }
        };

        let open = numeric(PriceField::Open)?;
        let high = numeric(PriceField::High)?.unwrap_or_default();
        let low = numeric(PriceField::Low)?.unwrap_or_default();
        let close = numeric(PriceField::Close)?.unwrap_or_default();
        let volume = numeric(PriceField::Volume)?.unwrap_or_default();

        Ok(ValidatedSeries {
            ticker: raw.ticker().to_string(),
            dates,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

fn frame_error(column: &str, e: PolarsError) -> ValidationError {
    ValidationError::Frame {
        column: column.to_string(),
        message: e.to_string(),
    }
}

/// Date column as text; the cleaner owns date parsing.
fn date_tokens(frame: &DataFrame) -> Result<Vec<Option<String>>, ValidationError> {
    let series = frame
        .column(DATE_COLUMN)
        .map_err(|e| frame_error(DATE_COLUMN, e))?
        .as_materialized_series();
    if series.dtype().is_nested() {
        return Err(ShapeError::Nested {
            column: DATE_COLUMN.to_string(),
            dtype: series.dtype().to_string(),
        }
        .into());
    }
    let text = series
        .cast(&DataType::String)
        .map_err(|e| frame_error(DATE_COLUMN, e))?;
    let chunked = text.str().map_err(|e| frame_error(DATE_COLUMN, e))?;
    Ok(chunked.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Coerce one column to f64. Nulls and non-finite values become `None`.
pub fn coerce_f64(column: &str, series: &Series) -> Result<Vec<Option<f64>>, ValidationError> {
    let dtype = series.dtype();

    if dtype.is_nested() {
        return Err(ShapeError::Nested {
            column: column.to_string(),
            dtype: dtype.to_string(),
        }
        .into());
    }

    match dtype {
        DataType::String => {
            let chunked = series.str().map_err(|e| frame_error(column, e))?;
            chunked
                .into_iter()
                .enumerate()
                .map(|(row, token)| parse_token(column, row, token))
                .collect()
        }
        DataType::Boolean | DataType::Null => Err(ValidationError::UnsupportedDtype {
            column: column.to_string(),
            dtype: dtype.to_string(),
        }),
        _ => {
            let cast = series
                .cast(&DataType::Float64)
                .map_err(|_| ValidationError::UnsupportedDtype {
                    column: column.to_string(),
                    dtype: dtype.to_string(),
                })?;
            let chunked = cast.f64().map_err(|e| frame_error(column, e))?;
            Ok(chunked
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect())
        }
    }
}

fn parse_token(column: &str, row: usize, token: Option<&str>) -> Result<Option<f64>, ValidationError> {
    let token = match token.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(t) => t,
    };
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Ok(None),
        Err(_) => Err(ValidationError::NonNumeric {
            column: column.to_string(),
            row,
            token: token.to_string(),
        }),
    }
}
