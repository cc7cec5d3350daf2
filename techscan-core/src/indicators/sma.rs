//! Simple Moving Average (SMA).
//!
//! Mean of close prices over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    /// Column is named `MA{period}`.
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("MA{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn sources(&self) -> &'static [PriceField] {
        &[PriceField::Close]
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64> {
        sma_of_series(inputs.close(), self.period)
    }
}

/// Windowed mean of an arbitrary series. Any NaN in a window makes that output NaN.
///
/// Each window is summed from scratch so the result does not depend on
/// accumulated rounding from earlier rows.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().sum::<f64>() / period as f64;
    }

    result
}
