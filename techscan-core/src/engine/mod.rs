//! Indicator engine.
//!
//! Holds an ordered list of indicators and computes each one over a clean
//! series. An indicator whose minimum observation count is not met is left
//! out of the result and recorded as an omission; the other indicators are
//! unaffected.

pub mod profile;

pub use profile::{IndicatorProfile, UnknownProfile};

use crate::domain::{CleanSeries, IndicatorSet, PriceField, ShapeError};
use crate::indicators::{
    Adx, Atr, Bollinger, Cci, Indicator, Macd, Mfi, PriceInputs, Roc, Rsi, Sma, Stochastic,
    WilliamsR,
};
use std::fmt;
use tracing::debug;

pub struct IndicatorEngine {
    indicators: Vec<Box<dyn Indicator>>,
}

impl IndicatorEngine {
    pub fn new(indicators: Vec<Box<dyn Indicator>>) -> Self {
        Self { indicators }
    }

    /// Engine for a named profile, with the standard parameters.
    pub fn for_profile(profile: IndicatorProfile) -> Self {
        let mut indicators: Vec<Box<dyn Indicator>> = Vec::new();
        if profile.includes_technical() {
            indicators.extend(technical_indicators());
        }
        if profile.includes_advanced() {
            indicators.extend(advanced_indicators());
        }
        Self::new(indicators)
    }

    /// Every standard indicator.
    pub fn standard() -> Self {
        Self::for_profile(IndicatorProfile::Full)
    }

    pub fn indicators(&self) -> &[Box<dyn Indicator>] {
        &self.indicators
    }

    /// Column names in output order.
    pub fn column_names(&self) -> Vec<&str> {
        self.indicators.iter().map(|i| i.name()).collect()
    }

    /// Price fields read by at least one indicator, deduplicated and sorted.
    pub fn required_sources(&self) -> Vec<PriceField> {
        let mut fields: Vec<PriceField> = self
            .indicators
            .iter()
            .flat_map(|i| i.sources().iter().copied())
            .collect();
        fields.sort();
        fields.dedup();
        fields
    }

    /// Smallest series length at which every column is emitted.
    pub fn full_history(&self) -> usize {
        self.indicators
            .iter()
            .map(|i| i.min_observations())
            .max()
            .unwrap_or(0)
    }

    pub fn compute(&self, series: &CleanSeries) -> Result<IndicatorSet, ShapeError> {
        let inputs = PriceInputs::new(series.high(), series.low(), series.close(), series.volume())?;
        Ok(self.compute_inputs(&inputs))
    }

    pub fn compute_inputs(&self, inputs: &PriceInputs<'_>) -> IndicatorSet {
        let available = inputs.len();
        let mut set = IndicatorSet::new();

        for indicator in &self.indicators {
            let required = indicator.min_observations();
            if available < required {
                debug!(
                    indicator = indicator.name(),
                    required, available, "omitting indicator: not enough history"
                );
                set.omit(indicator.name(), required, available);
                continue;
            }

            let values = indicator.compute(inputs);
            debug_assert_eq!(
                values.len(),
                available,
                "indicator '{}' produced {} values for {} rows",
                indicator.name(),
                values.len(),
                available
            );
            set.push(indicator.name(), values);
        }

        set
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for IndicatorEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorEngine")
            .field("indicators", &self.column_names())
            .finish()
    }
}

fn technical_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Sma::new(10)),
        Box::new(Sma::new(20)),
        Box::new(Rsi::new(14)),
        Box::new(Macd::line(12, 26, 9)),
        Box::new(Macd::signal(12, 26, 9)),
        Box::new(Macd::histogram(12, 26, 9)),
        Box::new(Bollinger::upper(20, 2.0)),
        Box::new(Bollinger::middle(20, 2.0)),
        Box::new(Bollinger::lower(20, 2.0)),
        Box::new(Atr::new(14)),
        Box::new(Adx::new(14)),
    ]
}

fn advanced_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Stochastic::k(14, 3, 3)),
        Box::new(Stochastic::d(14, 3, 3)),
        Box::new(Cci::new(20)),
        Box::new(WilliamsR::new(14)),
        Box::new(Mfi::new(14)),
        Box::new(Roc::new(10)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + (i as f64 * 0.4).sin() * 6.0 + i as f64 * 0.2).collect()
    }

    #[test]
    fn full_profile_column_order() {
        let engine = IndicatorEngine::standard();
        assert_eq!(
            engine.column_names(),
            vec![
                "MA10", "MA20", "RSI", "MACD", "MACD_signal", "MACD_hist", "Upper_BB",
                "Middle_BB", "Lower_BB", "ATR", "ADX", "STOCH_K", "STOCH_D", "CCI",
                "WILLIAMS_R", "MFI", "ROC",
            ]
        );
    }

    #[test]
    fn short_series_omits_macd_only() {
        let bars = make_bars(&wave(22));
        let set = IndicatorEngine::for_profile(IndicatorProfile::Technical)
            .compute_inputs(&bars.inputs());

        assert!(set.contains("RSI"));
        assert!(set.contains("MA20"));
        assert!(set.contains("Upper_BB"));
        assert!(set.contains("ATR"));
        assert_eq!(set.omitted_names(), vec!["MACD", "MACD_signal", "MACD_hist", "ADX"]);
        let macd = set.omitted().iter().find(|o| o.name == "MACD").unwrap();
        assert_eq!((macd.required, macd.available), (26, 22));
    }

    #[test]
    fn long_series_has_every_column() {
        let engine = IndicatorEngine::standard();
        let bars = make_bars(&wave(engine.full_history()));
        let set = engine.compute_inputs(&bars.inputs());
        assert!(set.omitted().is_empty());
        assert_eq!(set.len(), 17);
        for col in set.columns() {
            assert_eq!(col.values.len(), engine.full_history());
            assert!(col.values.last().unwrap().is_finite(), "{}", col.name);
        }
    }

    #[test]
    fn full_history_is_macd_signal() {
        assert_eq!(IndicatorEngine::standard().full_history(), 34);
        assert_eq!(
            IndicatorEngine::for_profile(IndicatorProfile::Advanced).full_history(),
            18
        );
    }

    #[test]
    fn required_sources_by_profile() {
        let technical = IndicatorEngine::for_profile(IndicatorProfile::Technical);
        assert_eq!(
            technical.required_sources(),
            vec![PriceField::High, PriceField::Low, PriceField::Close]
        );
        let advanced = IndicatorEngine::for_profile(IndicatorProfile::Advanced);
        assert!(advanced.required_sources().contains(&PriceField::Volume));
    }

    #[test]
    fn engine_is_send_sync() {
        fn require<T: Send + Sync>() {}
        require::<IndicatorEngine>();
    }
}
