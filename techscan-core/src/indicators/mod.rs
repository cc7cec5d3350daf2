//! Concrete indicator implementations.
//!
//! Every indicator is a pure function of equal-length f64 price arrays,
//! borrowed through [`PriceInputs`]. Output has the same length as the input;
//! positions inside the warm-up window are NaN.
//!
//! Multi-output indicators (MACD, Bollinger, Stochastic) are exposed as
//! separate named instances per output, so each instance yields one column.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod mfi;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod williams_r;

pub use adx::Adx;
pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerBand};
pub use cci::Cci;
pub use macd::{Macd, MacdOutput};
pub use mfi::Mfi;
pub use roc::Roc;
pub use rsi::Rsi;
pub use sma::Sma;
pub use stochastic::{Stochastic, StochasticLine};
pub use williams_r::WilliamsR;

use crate::domain::{PriceField, ShapeError};

/// A named indicator producing one column.
pub trait Indicator: Send + Sync {
    /// Column name in the persisted table.
    fn name(&self) -> &str;

    /// Price fields read by `compute`.
    fn sources(&self) -> &'static [PriceField];

    /// Index of the first non-NaN output on a series without gaps.
    fn lookback(&self) -> usize;

    /// Observations needed before the column is worth emitting.
    fn min_observations(&self) -> usize {
        self.lookback() + 1
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64>;
}

/// Borrowed price arrays, all the same length.
#[derive(Debug, Clone, Copy)]
pub struct PriceInputs<'a> {
    high: &'a [f64],
    low: &'a [f64],
    close: &'a [f64],
    volume: &'a [f64],
}

impl<'a> PriceInputs<'a> {
    /// Fails with [`ShapeError::LengthMismatch`] unless every array is as long as `close`.
    pub fn new(
        high: &'a [f64],
        low: &'a [f64],
        close: &'a [f64],
        volume: &'a [f64],
    ) -> Result<Self, ShapeError> {
        let expected = close.len();
        for (field, values) in [
            (PriceField::High, high),
            (PriceField::Low, low),
            (PriceField::Volume, volume),
        ] {
            if values.len() != expected {
                return Err(ShapeError::LengthMismatch {
                    column: field.column().to_string(),
                    expected,
                    actual: values.len(),
                });
            }
        }
        Ok(Self {
            high,
            low,
            close,
            volume,
        })
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn high(&self) -> &'a [f64] {
        self.high
    }

    pub fn low(&self) -> &'a [f64] {
        self.low
    }

    pub fn close(&self) -> &'a [f64] {
        self.close
    }

    pub fn volume(&self) -> &'a [f64] {
        self.volume
    }
}

/// Owned synthetic bars for indicator tests.
#[cfg(test)]
pub struct TestBars {
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

#[cfg(test)]
impl TestBars {
    pub fn inputs(&self) -> PriceInputs<'_> {
        PriceInputs::new(&self.high, &self.low, &self.close, &self.volume).unwrap()
    }
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high = max(open,close) + 1.0,
/// low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> TestBars {
    let mut high = Vec::with_capacity(closes.len());
    let mut low = Vec::with_capacity(closes.len());
    for (i, &close) in closes.iter().enumerate() {
        let open = if i == 0 { close } else { closes[i - 1] };
        high.push(open.max(close) + 1.0);
        low.push(open.min(close) - 1.0);
    }
    TestBars {
        high,
        low,
        close: closes.to_vec(),
        volume: vec![1000.0; closes.len()],
    }
}

/// Bars from explicit (high, low, close) triples with constant volume.
#[cfg(test)]
pub fn make_hlc_bars(data: &[(f64, f64, f64)]) -> TestBars {
    TestBars {
        high: data.iter().map(|b| b.0).collect(),
        low: data.iter().map(|b| b.1).collect(),
        close: data.iter().map(|b| b.2).collect(),
        volume: vec![1000.0; data.len()],
    }
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
