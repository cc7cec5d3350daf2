//! Rate of Change (ROC).
//!
//! Percentage price change over N bars.
//! ROC[t] = (close[t] - close[t-period]) / close[t-period] * 100
//! Lookback: period.

use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ROC period must be >= 1");
        Self { period }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        "ROC"
    }

    fn sources(&self) -> &'static [PriceField] {
        &[PriceField::Close]
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64> {
        let close = inputs.close();
        let n = close.len();
        let mut result = vec![f64::NAN; n];

        for i in self.period..n {
            let prev = close[i - self.period];
            let curr = close[i];
            if prev.is_nan() || curr.is_nan() || prev == 0.0 {
                continue;
            }
            result[i] = (curr - prev) / prev * 100.0;
        }

        result
    }
}
