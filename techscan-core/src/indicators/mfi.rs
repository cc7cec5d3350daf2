//! Money Flow Index (MFI).
//!
//! typical price TP = (high + low + close) / 3, raw flow = TP * volume.
//! Flow counts as positive when TP rose from the previous bar, negative when
//! it fell. MFI = 100 * positive / (positive + negative) over `period` bars.
//! No flow in either direction yields 50.
//! Lookback: period.

use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

#[derive(Debug, Clone)]
pub struct Mfi {
    period: usize,
}

impl Mfi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "MFI period must be >= 1");
        Self { period }
    }
}

pub(crate) fn typical_price(inputs: &PriceInputs<'_>) -> Vec<f64> {
    inputs
        .high()
        .iter()
        .zip(inputs.low())
        .zip(inputs.close())
        .map(|((h, l), c)| (h + l + c) / 3.0)
        .collect()
}

impl Indicator for Mfi {
    fn name(&self) -> &str {
        "MFI"
    }

    fn sources(&self) -> &'static [PriceField] {
        &[
            PriceField::High,
            PriceField::Low,
            PriceField::Close,
            PriceField::Volume,
        ]
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64> {
        let n = inputs.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period + 1 {
            return result;
        }

        let tp = typical_price(inputs);
        let volume = inputs.volume();

        // Signed flow per bar; index 0 has no previous bar.
        let mut positive = vec![0.0; n];
        let mut negative = vec![0.0; n];
        for i in 1..n {
            let flow = tp[i] * volume[i];
            if tp[i] > tp[i - 1] {
                positive[i] = flow;
            } else if tp[i] < tp[i - 1] {
                negative[i] = flow;
            }
        }

        for i in self.period..n {
            let start = i + 1 - self.period;
            let pos: f64 = positive[start..=i].iter().sum();
            let neg: f64 = negative[start..=i].iter().sum();
            if pos.is_nan() || neg.is_nan() {
                continue;
            }
            let total = pos + neg;
            result[i] = if total == 0.0 { 50.0 } else { 100.0 * pos / total };
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn rising_prices_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 10.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let result = Mfi::new(14).compute(&bars.inputs());
        assert!(result[..14].iter().all(|v| v.is_nan()));
        assert_approx(result[14], 100.0, DEFAULT_EPSILON);
        assert_approx(result[19], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn flat_prices_is_neutral() {
        let bars = make_bars(&[10.0; 6]);
        let result = Mfi::new(3).compute(&bars.inputs());
        assert_eq!(result[3], 50.0);
    }

    #[test]
    fn mixed_flow_known_value() {
        // make_bars: TP rises on bar 1 (flow 1000 * tp1), falls on bar 2
        let bars = make_bars(&[10.0, 12.0, 9.0]);
        let inputs = bars.inputs();
        let tp = typical_price(&inputs);
        let pos = tp[1] * 1000.0;
        let neg = tp[2] * 1000.0;
        let result = Mfi::new(2).compute(&inputs);
        assert_approx(result[2], 100.0 * pos / (pos + neg), DEFAULT_EPSILON);
    }

    #[test]
    fn standard_min_observations() {
        assert_eq!(Mfi::new(14).min_observations(), 15);
    }
}
