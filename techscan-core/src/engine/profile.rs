//! Named indicator sets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which family of indicators to compute.
///
/// - `Technical`: moving averages, RSI, MACD, Bollinger Bands, ATR, ADX
/// - `Advanced`: Stochastic, CCI, Williams %R, MFI, ROC
/// - `Full`: both, technical first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorProfile {
    Technical,
    Advanced,
    #[default]
    Full,
}

impl IndicatorProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorProfile::Technical => "technical",
            IndicatorProfile::Advanced => "advanced",
            IndicatorProfile::Full => "full",
        }
    }

    pub fn includes_technical(&self) -> bool {
        matches!(self, IndicatorProfile::Technical | IndicatorProfile::Full)
    }

    pub fn includes_advanced(&self) -> bool {
        matches!(self, IndicatorProfile::Advanced | IndicatorProfile::Full)
    }
}

impl fmt::Display for IndicatorProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown indicator profile '{0}' (expected technical, advanced or full)")]
pub struct UnknownProfile(pub String);

impl FromStr for IndicatorProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "technical" => Ok(IndicatorProfile::Technical),
            "advanced" => Ok(IndicatorProfile::Advanced),
            "full" | "all" => Ok(IndicatorProfile::Full),
            _ => Err(UnknownProfile(s.to_string())),
        }
    }
}
