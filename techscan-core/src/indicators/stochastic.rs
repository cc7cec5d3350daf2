//! Slow stochastic oscillator.
//!
//! fast %K = 100 * (close - lowest_low) / (highest_high - lowest_low) over `k_period`
//! slow %K = SMA(fast %K, k_slowing)
//! slow %D = SMA(slow %K, d_period)
//!
//! A window with no range yields fast %K = 0.
//! Lookback: k_period + k_slowing - 2 for %K, plus d_period - 1 for %D.
//! Each line starts as soon as its own window is full; %K is not held back
//! until %D is available, so it leads TA-Lib's STOCH output by d_period - 1 rows.

use super::sma::sma_of_series;
use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StochasticLine {
    K,
    D,
}

#[derive(Debug, Clone)]
pub struct Stochastic {
    k_period: usize,
    k_slowing: usize,
    d_period: usize,
    line: StochasticLine,
}

impl Stochastic {
    fn with_line(k_period: usize, k_slowing: usize, d_period: usize, line: StochasticLine) -> Self {
        assert!(
            k_period >= 1 && k_slowing >= 1 && d_period >= 1,
            "Stochastic periods must be >= 1"
        );
        Self {
            k_period,
            k_slowing,
            d_period,
            line,
        }
    }

    pub fn k(k_period: usize, k_slowing: usize, d_period: usize) -> Self {
        Self::with_line(k_period, k_slowing, d_period, StochasticLine::K)
    }

    pub fn d(k_period: usize, k_slowing: usize, d_period: usize) -> Self {
        Self::with_line(k_period, k_slowing, d_period, StochasticLine::D)
    }
}

/// Highest high and lowest low over each trailing window, NaN during warm-up.
pub(crate) fn rolling_extremes(high: &[f64], low: &[f64], period: usize) -> (Vec<f64>, Vec<f64>) {
    let n = high.len();
    let mut highest = vec![f64::NAN; n];
    let mut lowest = vec![f64::NAN; n];

    if period == 0 || n < period {
        return (highest, lowest);
    }

    for i in (period - 1)..n {
        let start = i + 1 - period;
        let hs = &high[start..=i];
        let ls = &low[start..=i];
        if hs.iter().chain(ls).any(|v| v.is_nan()) {
            continue;
        }
        highest[i] = hs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        lowest[i] = ls.iter().copied().fold(f64::INFINITY, f64::min);
    }

    (highest, lowest)
}

fn fast_k(inputs: &PriceInputs<'_>, period: usize) -> Vec<f64> {
    let (highest, lowest) = rolling_extremes(inputs.high(), inputs.low(), period);
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
                100.0 * (c - ll) / (hh - ll)
            }
        })
        .collect()
}

impl Indicator for Stochastic {
    fn name(&self) -> &str {
        match self.line {
            StochasticLine::K => "STOCH_K",
            StochasticLine::D => "STOCH_D",
        }
    }

    fn sources(&self) -> &'static [PriceField] {
        &[PriceField::High, PriceField::Low, PriceField::Close]
    }

    fn lookback(&self) -> usize {
        let k = self.k_period + self.k_slowing - 2;
        match self.line {
            StochasticLine::K => k,
            StochasticLine::D => k + self.d_period - 1,
        }
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64> {
        let slow_k = sma_of_series(&fast_k(inputs, self.k_period), self.k_slowing);
        match self.line {
            StochasticLine::K => slow_k,
            StochasticLine::D => sma_of_series(&slow_k, self.d_period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, make_hlc_bars, DEFAULT_EPSILON};

    #[test]
    fn close_at_high_is_100() {
        let bars = make_hlc_bars(&[(10.0, 0.0, 5.0), (10.0, 0.0, 10.0), (10.0, 0.0, 10.0)]);
        let k = Stochastic::k(2, 1, 1).compute(&bars.inputs());
        assert!(k[0].is_nan());
        assert_approx(k[1], 100.0, DEFAULT_EPSILON);
        assert_approx(k[2], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_range_window_is_zero() {
        let bars = make_hlc_bars(&[(5.0, 5.0, 5.0); 4]);
        let k = Stochastic::k(2, 1, 1).compute(&bars.inputs());
        assert_eq!(k[1], 0.0);
    }

    #[test]
    fn warmup_matches_lookback() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 + (i as f64).cos() * 3.0).collect();
        let bars = make_bars(&closes);
        for stoch in [Stochastic::k(14, 3, 3), Stochastic::d(14, 3, 3)] {
            let result = stoch.compute(&bars.inputs());
            let lb = stoch.lookback();
            assert!(result[..lb].iter().all(|v| v.is_nan()), "{}", stoch.name());
            assert!(result[lb..].iter().all(|v| (0.0..=100.0).contains(v)), "{}", stoch.name());
        }
    }

    #[test]
    fn standard_min_observations() {
        assert_eq!(Stochastic::k(14, 3, 3).min_observations(), 16);
        assert_eq!(Stochastic::d(14, 3, 3).min_observations(), 18);
    }
}
