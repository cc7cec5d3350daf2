//! Data path: fetchers, validation and cleaning.

pub mod cleaner;
pub mod csv_dir;
pub mod provider;
pub mod synthetic;
pub mod validator;
pub mod yahoo;

pub use cleaner::{parse_date, CleanError, SeriesCleaner, DEFAULT_MIN_HISTORY};
pub use csv_dir::CsvDirFetcher;
pub use provider::{FetchError, SeriesFetcher};
pub use synthetic::SyntheticFetcher;
pub use validator::{SeriesValidator, ValidatedSeries, ValidationError};
pub use yahoo::YahooFetcher;
