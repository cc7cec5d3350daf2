//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0; no movement → 50.

use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self { period }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "RSI"
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

        if n < self.period + 1 {
            return result;
        }

        let changes: Vec<f64> = std::iter::once(f64::NAN)
            .chain(close.windows(2).map(|w| w[1] - w[0]))
            .collect();

        // Seed: simple average of the first `period` changes
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;
        for &ch in &changes[1..=self.period] {
            if ch.is_nan() {
                return result;
            }
            if ch > 0.0 {
                avg_gain += ch;
            } else {
                avg_loss -= ch;
            }
        }
        avg_gain /= self.period as f64;
        avg_loss /= self.period as f64;
        result[self.period] = compute_rsi(avg_gain, avg_loss);

        let alpha = 1.0 / self.period as f64;
        for i in (self.period + 1)..n {
            if changes[i].is_nan() {
                return result;
            }
            let gain = changes[i].max(0.0);
            let loss = (-changes[i]).max(0.0);

            avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;

            result[i] = compute_rsi(avg_gain, avg_loss);
        }

        result
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rising_closes_pin_rsi_at_100() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let result = Rsi::new(14).compute(&bars.inputs());
        assert!(result[..14].iter().all(|v| v.is_nan()));
        for &v in &result[14..] {
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn all_losses_is_zero() {
        let bars = make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        let result = Rsi::new(3).compute(&bars.inputs());
        assert_approx(result[3], 0.0, 1e-6);
    }

    #[test]
    fn flat_series_is_neutral() {
        let bars = make_bars(&[100.0; 8]);
        let result = Rsi::new(3).compute(&bars.inputs());
        assert_eq!(result[3], 50.0);
        assert_eq!(result[7], 50.0);
    }

    #[test]
    fn mixed_seed_value() {
        // changes +0.34, -0.25, -0.48 → avg_gain 0.34/3, avg_loss 0.73/3
        let bars = make_bars(&[44.0, 44.34, 44.09, 43.61, 44.33]);
        let result = Rsi::new(3).compute(&bars.inputs());
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);
    }

    #[test]
    fn rsi_bounds() {
        let bars = make_bars(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0]);
        let result = Rsi::new(3).compute(&bars.inputs());
        for (i, &v) in result.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "RSI out of bounds at bar {i}: {v}");
            }
        }
    }

    #[test]
    fn standard_min_observations() {
        assert_eq!(Rsi::new(14).lookback(), 14);
        assert_eq!(Rsi::new(14).min_observations(), 15);
    }
}
