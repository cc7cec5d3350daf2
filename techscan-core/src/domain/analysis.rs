//! Indicator columns and the per-ticker analysis result.

use super::category::Category;
use super::series::CleanSeries;
use serde::{Deserialize, Serialize};

/// One computed indicator column. Leading warm-up values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// An indicator that was skipped because the series was too short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Omission {
    pub name: String,
    pub required: usize,
    pub available: usize,
}

/// Indicator columns attached to a clean series, in engine order.
///
/// A column is either present for the full length of the series or absent
/// altogether; absent columns are recorded in `omitted`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    columns: Vec<IndicatorColumn>,
    omitted: Vec<Omission>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.columns.push(IndicatorColumn {
            name: name.into(),
            values,
        });
    }

    pub(crate) fn omit(&mut self, name: impl Into<String>, required: usize, available: usize) {
        self.omitted.push(Omission {
            name: name.into(),
            required,
            available,
        });
    }

    pub fn columns(&self) -> &[IndicatorColumn] {
        &self.columns
    }

    pub fn omitted(&self) -> &[Omission] {
        &self.omitted
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn omitted_names(&self) -> Vec<&str> {
        self.omitted.iter().map(|o| o.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// A clean series and its indicators, scoped to one ticker and category.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub category: Category,
    pub series: CleanSeries,
    pub indicators: IndicatorSet,
}

impl AnalysisResult {
    pub fn new(category: Category, series: CleanSeries, indicators: IndicatorSet) -> Self {
        Self {
            category,
            series,
            indicators,
        }
    }

    pub fn ticker(&self) -> &str {
        self.series.ticker()
    }

    /// Rows in the persisted table.
    pub fn rows(&self) -> usize {
        self.series.len()
    }
}
