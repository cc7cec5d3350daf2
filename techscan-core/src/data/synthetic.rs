//! Deterministic synthetic fetcher for demos and tests.
//!
//! Produces a random walk from a starting price of 100.0 on weekdays only.
//! The walk is seeded from the fetcher seed and the ticker, so the same
//! ticker always yields the same series for the same range.

use super::provider::{FetchError, SeriesFetcher};
use crate::domain::{RawSeries, DATE_COLUMN};
use chrono::{Datelike, NaiveDate, Weekday};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Default)]
pub struct SyntheticFetcher {
    seed: u64,
}

impl SyntheticFetcher {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, ticker: &str) -> StdRng {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(ticker.as_bytes());
        StdRng::from_seed(*hasher.finalize().as_bytes())
    }

    /// Generate the walk as a polars frame with a string `Date` column.
    pub fn generate(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> PolarsResult<DataFrame> {
        let mut rng = self.rng_for(ticker);

        let mut dates = Vec::new();
        let mut opens = Vec::new();
        let mut highs = Vec::new();
        let mut lows = Vec::new();
        let mut closes = Vec::new();
        let mut volumes = Vec::new();

        let mut price = 100.0_f64;
        for current in start.iter_days().take_while(|d| *d <= end) {
            if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            let open = price;
            let close = price * (1.0 + daily_return);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
            let volume = rng.gen_range(500_000..5_000_000u64) as f64;

            dates.push(current.format("%Y-%m-%d").to_string());
            opens.push(open);
            highs.push(high);
            lows.push(low);
            closes.push(close);
            volumes.push(volume);

            price = close;
        }

        DataFrame::new(vec![
            Column::from(Series::new(DATE_COLUMN.into(), dates)),
            Column::from(Series::new("Open".into(), opens)),
            Column::from(Series::new("High".into(), highs)),
            Column::from(Series::new("Low".into(), lows)),
            Column::from(Series::new("Close".into(), closes)),
            Column::from(Series::new("Volume".into(), volumes)),
        ])
    }
}

impl SeriesFetcher for SyntheticFetcher {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, FetchError> {
        let frame = self
            .generate(ticker, start, end)
            .map_err(|e| FetchError::Other(e.to_string()))?;
        if frame.height() == 0 {
            return Err(FetchError::no_data(ticker));
        }
        Ok(RawSeries::new(ticker, frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_ticker_same_series() {
        let f = SyntheticFetcher::new(7);
        let a = f.fetch("SPY", date(2024, 1, 1), date(2024, 3, 1)).unwrap();
        let b = f.fetch("SPY", date(2024, 1, 1), date(2024, 3, 1)).unwrap();
        assert!(a.frame().equals(b.frame()));
    }

    #[test]
    fn different_tickers_differ() {
        let f = SyntheticFetcher::new(7);
        let a = f.fetch("SPY", date(2024, 1, 1), date(2024, 3, 1)).unwrap();
        let b = f.fetch("QQQ", date(2024, 1, 1), date(2024, 3, 1)).unwrap();
        assert!(!a.frame().equals(b.frame()));
    }

    #[test]
    fn weekdays_only() {
        // 2024-01-06 and 2024-01-07 are a weekend
        let f = SyntheticFetcher::default();
        let raw = f.fetch("SPY", date(2024, 1, 1), date(2024, 1, 7)).unwrap();
        assert_eq!(raw.len(), 5);
    }

    #[test]
    fn weekend_only_range_is_no_data() {
        let f = SyntheticFetcher::default();
        let err = f.fetch("SPY", date(2024, 1, 6), date(2024, 1, 7)).unwrap_err();
        assert_eq!(err, FetchError::no_data("SPY"));
    }

    #[test]
    fn high_low_bracket_close() {
        let f = SyntheticFetcher::new(1);
        let df = f.generate("AAPL", date(2024, 1, 1), date(2024, 6, 1)).unwrap();
        let high = df.column("High").unwrap().f64().unwrap().clone();
        let low = df.column("Low").unwrap().f64().unwrap().clone();
        let close = df.column("Close").unwrap().f64().unwrap().clone();
        for ((h, l), c) in high.into_iter().zip(low.into_iter()).zip(close.into_iter()) {
            let (h, l, c) = (h.unwrap(), l.unwrap(), c.unwrap());
            assert!(l <= c && c <= h);
        }
    }
}
