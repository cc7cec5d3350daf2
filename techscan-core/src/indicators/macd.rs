//! MACD: difference of a fast and a slow EMA of close.
//!
//! Three outputs (separate Indicator instances):
//! - Line: EMA(fast) - EMA(slow)
//! - Signal: EMA(signal) of the line
//! - Histogram: line - signal
//!
//! Lookback: slow - 1 for the line, slow + signal - 2 for signal and histogram.
//! The line is emitted from its own lookback rather than aligned to the signal,
//! so it starts signal - 1 rows earlier than TA-Lib's MACD.

use super::ema::ema_of_series;
use super::{Indicator, PriceInputs};
use crate::domain::PriceField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdOutput {
    Line,
    Signal,
    Histogram,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    output: MacdOutput,
}

impl Macd {
    fn with_output(fast: usize, slow: usize, signal: usize, output: MacdOutput) -> Self {
        assert!(fast >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(slow > fast, "MACD slow period must exceed fast period");
        Self {
            fast,
            slow,
            signal,
            output,
        }
    }

    pub fn line(fast: usize, slow: usize, signal: usize) -> Self {
        Self::with_output(fast, slow, signal, MacdOutput::Line)
    }

    pub fn signal(fast: usize, slow: usize, signal: usize) -> Self {
        Self::with_output(fast, slow, signal, MacdOutput::Signal)
    }

    pub fn histogram(fast: usize, slow: usize, signal: usize) -> Self {
        Self::with_output(fast, slow, signal, MacdOutput::Histogram)
    }

    fn macd_line(&self, close: &[f64]) -> Vec<f64> {
        let fast = ema_of_series(close, self.fast);
        let slow = ema_of_series(close, self.slow);
        fast.iter().zip(&slow).map(|(f, s)| f - s).collect()
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        match self.output {
            MacdOutput::Line => "MACD",
            MacdOutput::Signal => "MACD_signal",
            MacdOutput::Histogram => "MACD_hist",
        }
    }

    fn sources(&self) -> &'static [PriceField] {
        &[PriceField::Close]
    }

    fn lookback(&self) -> usize {
        match self.output {
            MacdOutput::Line => self.slow - 1,
            MacdOutput::Signal | MacdOutput::Histogram => self.slow + self.signal - 2,
        }
    }

    fn compute(&self, inputs: &PriceInputs<'_>) -> Vec<f64> {
        let line = self.macd_line(inputs.close());
        if self.output == MacdOutput::Line {
            return line;
        }
        let signal = ema_of_series(&line, self.signal);
        match self.output {
            MacdOutput::Histogram => line.iter().zip(&signal).map(|(l, s)| l - s).collect(),
            _ => signal,
        }
    }
}
