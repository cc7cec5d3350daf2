//! ADX: Average Directional Index (Wilder).
//!
//! Steps:
//! 1. Compute +DM and -DM from consecutive bars
//! 2. Smooth +DM, -DM, and TR using Wilder smoothing (alpha = 1/period)
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR)
//! 4. -DI = 100 * smoothed(-DM) / smoothed(TR)
//! 5. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 6. ADX = Wilder-smoothed DX
//!
//! Lookback: 2 * period - 1 (DI is valid at `period`, ADX needs `period` DX values).

use super::atr::{true_range, wilder_smooth};
use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self { period }
    }
}

/// +DM and -DM series. Index 0 is NaN.
fn directional_movement(high: &[f64], low: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = high.len();
    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];

    for i in 1..n {
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        if up.is_nan() || down.is_nan() {
            continue;
        }
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }

    (plus_dm, minus_dm)
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        "ADX"
    }

    fn sources(&self) -> &'static [PriceField] {
        &[PriceField::High, PriceField::Low, PriceField::Close]
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64> {
        let n = inputs.len();
        let (plus_dm, minus_dm) = directional_movement(inputs.high(), inputs.low());
        let tr = true_range(inputs.high(), inputs.low(), inputs.close());

        let smooth_tr = wilder_smooth(&tr, self.period);
        let smooth_plus = wilder_smooth(&plus_dm, self.period);
        let smooth_minus = wilder_smooth(&minus_dm, self.period);

        let mut dx = vec![f64::NAN; n];
        for i in 0..n {
            if smooth_tr[i].is_nan() || smooth_plus[i].is_nan() || smooth_minus[i].is_nan() {
                continue;
            }
            // No range at all: no directional information.
            if smooth_tr[i] == 0.0 {
                dx[i] = 0.0;
                continue;
            }
            let plus_di = 100.0 * smooth_plus[i] / smooth_tr[i];
            let minus_di = 100.0 * smooth_minus[i] / smooth_tr[i];
            let di_sum = plus_di + minus_di;
            dx[i] = if di_sum == 0.0 {
                0.0
            } else {
                100.0 * (plus_di - minus_di).abs() / di_sum
            };
        }

        wilder_smooth(&dx, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, make_hlc_bars};

    #[test]
    fn adx_bounds() {
        let bars = make_hlc_bars(&[
            (105.0, 95.0, 102.0),
            (108.0, 100.0, 106.0),
            (107.0, 98.0, 99.0),
            (103.0, 97.0, 101.0),
            (106.0, 100.0, 105.0),
            (110.0, 103.0, 108.0),
            (112.0, 106.0, 110.0),
            (111.0, 104.0, 105.0),
            (109.0, 103.0, 107.0),
            (113.0, 105.0, 112.0),
        ]);
        let result = Adx::new(3).compute(&bars.inputs());
        for (i, &v) in result.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "ADX out of bounds at bar {i}: {v}");
            }
        }
    }

    #[test]
    fn warmup_matches_lookback() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 4.0).collect();
        let bars = make_bars(&closes);
        let adx = Adx::new(14);
        let result = adx.compute(&bars.inputs());
        assert_eq!(adx.lookback(), 27);
        assert!(result[..27].iter().all(|v| v.is_nan()));
        assert!(result[27..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn steady_uptrend_is_strong() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + 2.0 * i as f64).collect();
        let bars = make_bars(&closes);
        let result = Adx::new(14).compute(&bars.inputs());
        // Every bar has +DM and no -DM, so DX is 100 throughout.
        assert_approx(result[39], 100.0, 1e-9);
    }

    #[test]
    fn standard_min_observations() {
        assert_eq!(Adx::new(14).min_observations(), 28);
    }
}
