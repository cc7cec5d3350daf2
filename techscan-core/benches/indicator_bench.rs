//! Criterion benchmarks for the data path.
//!
//! Benchmarks:
//! 1. Single indicators over in-memory price columns
//! 2. Full indicator engine per profile
//! 3. Validate + clean of a synthetic raw series

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use techscan_core::data::{SeriesCleaner, SeriesFetcher, SeriesValidator, SyntheticFetcher};
use techscan_core::engine::{IndicatorEngine, IndicatorProfile};
use techscan_core::indicators::{Adx, Indicator, Macd, PriceInputs, Rsi, Sma};

// ── Helpers ──────────────────────────────────────────────────────────

struct Columns {
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
}

fn make_columns(n: usize) -> Columns {
    let close: Vec<f64> = (0..n)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
        .collect();
    Columns {
        high: close.iter().map(|c| c + 1.5).collect(),
        low: close.iter().map(|c| c - 1.5).collect(),
        volume: (0..n).map(|i| 1_000_000.0 + (i % 500) as f64).collect(),
        close,
    }
}

impl Columns {
    fn inputs(&self) -> PriceInputs<'_> {
        PriceInputs::new(&self.high, &self.low, &self.close, &self.volume)
            .expect("bench columns share a length")
    }
}

// ── 1. Single indicators ─────────────────────────────────────────────

fn bench_single_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_single");

    for &bars in &[252, 1260, 2520] {
        let columns = make_columns(bars);
        let inputs = columns.inputs();

        let cases: Vec<Box<dyn Indicator>> = vec![
            Box::new(Sma::new(20)),
            Box::new(Rsi::new(14)),
            Box::new(Macd::signal(12, 26, 9)),
            Box::new(Adx::new(14)),
        ];
        for indicator in &cases {
            group.bench_with_input(
                BenchmarkId::new(indicator.name(), bars),
                &bars,
                |b, _| b.iter(|| indicator.compute(black_box(&inputs))),
            );
        }
    }

    group.finish();
}

// ── 2. Engine ────────────────────────────────────────────────────────

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_engine");

    for &bars in &[252, 1260, 2520] {
        let columns = make_columns(bars);
        let inputs = columns.inputs();

        for profile in [
            IndicatorProfile::Technical,
            IndicatorProfile::Advanced,
            IndicatorProfile::Full,
        ] {
            let engine = IndicatorEngine::for_profile(profile);
            group.bench_with_input(
                BenchmarkId::new(profile.as_str(), bars),
                &bars,
                |b, _| b.iter(|| engine.compute_inputs(black_box(&inputs))),
            );
        }
    }

    group.finish();
}

// ── 3. Validate + clean ──────────────────────────────────────────────

fn bench_clean(c: &mut Criterion) {
    let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let raw = SyntheticFetcher::new(42)
        .fetch("BENCH", start, end)
        .expect("synthetic data for a ten year range");
    let validator = SeriesValidator::default();
    let cleaner = SeriesCleaner::default();

    c.bench_function("validate_and_clean_10y", |b| {
        b.iter(|| {
            let validated = validator.validate(black_box(&raw)).unwrap();
            cleaner.clean(validated).unwrap()
        })
    });
}

criterion_group!(benches, bench_single_indicators, bench_engine, bench_clean);
criterion_main!(benches);
