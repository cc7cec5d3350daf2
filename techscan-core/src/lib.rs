//! techscan core: ticker universe, series fetchers, validation, cleaning and
//! the indicator engine.
//!
//! Data flows strictly forward:
//! - a [`data::SeriesFetcher`] returns a [`domain::RawSeries`]
//! - [`data::SeriesValidator`] types and checks its columns
//! - [`data::SeriesCleaner`] orders dates and fills gaps into a [`domain::CleanSeries`]
//! - [`engine::IndicatorEngine`] computes an [`domain::IndicatorSet`]

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
