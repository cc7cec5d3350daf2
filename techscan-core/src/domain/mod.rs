//! Domain types: categories, the ticker universe, price series, analysis results.

pub mod analysis;
pub mod category;
pub mod series;
pub mod universe;

pub use analysis::{AnalysisResult, IndicatorColumn, IndicatorSet, Omission};
pub use category::{Category, UnknownCategory};
pub use series::{CleanSeries, PriceField, RawSeries, ShapeError, DATE_COLUMN};
pub use universe::{path_safe, TickerEntry, TickerUniverse, UniverseError};
