//! Bollinger Bands: moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(close, period)
//! - Upper: middle + mult * stddev(close, period)
//! - Lower: middle - mult * stddev(close, period)
//!
//! Uses population stddev (divide by N).
//! Lookback: period - 1.

use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self {
            period,
            multiplier,
            band,
        }
    }

    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Upper)
    }

    pub fn middle(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Middle)
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BollingerBand::Lower)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        match self.band {
            BollingerBand::Upper => "Upper_BB",
            BollingerBand::Middle => "Middle_BB",
            BollingerBand::Lower => "Lower_BB",
        }
    }

    fn sources(&self) -> &'static [PriceField] {
        &[PriceField::Close]
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64> {
        let close = inputs.close();
        let n = close.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &close[(i + 1 - self.period)..=i];
            if window.iter().any(|v| v.is_nan()) {
                continue;
            }

            let mean = window.iter().sum::<f64>() / self.period as f64;
            if self.band == BollingerBand::Middle {
                result[i] = mean;
                continue;
            }

            let variance = window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
                / self.period as f64;
            let offset = self.multiplier * variance.sqrt();
            result[i] = match self.band {
                BollingerBand::Upper => mean + offset,
                _ => mean - offset,
            };
        }

        result
    }
}
