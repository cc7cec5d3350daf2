//! Commodity Channel Index (CCI).
//!
//! CCI = (TP - SMA(TP)) / (0.015 * mean_deviation(TP)) over `period`,
//! where TP = (high + low + close) / 3. Zero mean deviation yields 0.
//! Lookback: period - 1.

use super::mfi::typical_price;
use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

const LAMBERT_CONSTANT: f64 = 0.015;

#[derive(Debug, Clone)]
pub struct Cci {
    period: usize,
}

impl Cci {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "CCI period must be >= 1");
        Self { period }
    }
}

impl Indicator for Cci {
    fn name(&self) -> &str {
        "CCI"
    }

    fn sources(&self) -> &'static [PriceField] {
        &[PriceField::High, PriceField::Low, PriceField::Close]
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64> {
        let n = inputs.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        let tp = typical_price(inputs);
        for i in (self.period - 1)..n {
            let window = &tp[(i + 1 - self.period)..=i];
            if window.iter().any(|v| v.is_nan()) {
                continue;
            }
            let mean = window.iter().sum::<f64>() / self.period as f64;
            let mean_dev =
                window.iter().map(|v| (v - mean).abs()).sum::<f64>() / self.period as f64;
            result[i] = if mean_dev == 0.0 {
                0.0
            } else {
                (tp[i] - mean) / (LAMBERT_CONSTANT * mean_dev)
            };
        }

        result
    }
}
