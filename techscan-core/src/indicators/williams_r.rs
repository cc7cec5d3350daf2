//! Williams %R.
//!
//! %R = -100 * (highest_high - close) / (highest_high - lowest_low) over `period`.
//! Range is [-100, 0]; a window with no range yields 0.
//! Lookback: period - 1.

use super::stochastic::rolling_extremes;
use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

#[derive(Debug, Clone)]
pub struct WilliamsR {
    period: usize,
}

impl WilliamsR {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Williams %R period must be >= 1");
        Self { period }
    }
}

impl Indicator for WilliamsR {
    fn name(&self) -> &str {
        "WILLIAMS_R"
    }

    fn sources(&self) -> &'static [PriceField] {
        &[PriceField::High, PriceField::Low, PriceField::Close]
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64> {
        let (highest, lowest) = rolling_extremes(inputs.high(), inputs.low(), self.period);
        inputs
            .close()
            .iter()
            .zip(highest.iter().zip(&lowest))
            .map(|(&c, (&hh, &ll))| {
                if hh.is_nan() || ll.is_nan() || c.is_nan() {
                    f64::NAN
                } else if hh - ll == 0.0 {
                    0.0
                } else {
                    -100.0 * (hh - c) / (hh - ll)
                }
            })
            .collect()
    }
}
