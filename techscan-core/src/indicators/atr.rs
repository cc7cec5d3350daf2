//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (alpha = 1/period).
//! Lookback: period (TR needs a previous close, then `period` values are averaged).

use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self { period }
    }
}

/// True Range series. TR[0] is NaN because there is no previous close.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut tr = vec![f64::NAN; n];

    for i in 1..n {
        let (h, l, pc) = (high[i], low[i], close[i - 1]);
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }

    tr
}

/// Wilder smoothing with alpha = 1/period.
///
/// The seed is the mean of the first `period` consecutive non-NaN values,
/// placed at the last index of that window. A NaN after the seed taints the
/// rest of the output.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    let seed_start = (0..=(n - period))
        .find(|&i| values[i..i + period].iter().all(|v| !v.is_nan()));
    let seed_start = match seed_start {
        Some(s) => s,
        None => return result,
    };
    let seed_end = seed_start + period;

    let seed = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        let smoothed = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = smoothed;
        prev = smoothed;
    }

    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        "ATR"
    }

    fn sources(&self) -> &'static [PriceField] {
        &[PriceField::High, PriceField::Low, PriceField::Close]
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64> {
        let tr = true_range(inputs.high(), inputs.low(), inputs.close());
        wilder_smooth(&tr, self.period)
    }
}
