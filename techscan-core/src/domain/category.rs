//! Ticker category: ETF or individual equity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of a ticker. Only used to namespace outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "ETF")]
    Etf,
    Stock,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Etf, Category::Stock];

    /// Short label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Etf => "ETF",
            Category::Stock => "Stock",
        }
    }

    /// Directory name under the output root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Etf => "ETF",
            Category::Stock => "Stocks",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}' (expected ETF or Stock)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "etf" | "etfs" => Ok(Category::Etf),
            "stock" | "stocks" | "equity" => Ok(Category::Stock),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        assert_eq!("ETF".parse::<Category>().unwrap(), Category::Etf);
        assert_eq!("stocks".parse::<Category>().unwrap(), Category::Stock);
        assert_eq!(" Stock ".parse::<Category>().unwrap(), Category::Stock);
        assert!("bond".parse::<Category>().is_err());
    }

    #[test]
    fn stock_outputs_go_to_stocks_dir() {
        assert_eq!(Category::Stock.dir_name(), "Stocks");
        assert_eq!(Category::Etf.dir_name(), "ETF");
    }

    #[test]
    fn serializes_with_report_labels() {
        assert_eq!(serde_json::to_string(&Category::Etf).unwrap(), "\"ETF\"");
        assert_eq!(serde_json::to_string(&Category::Stock).unwrap(), "\"Stock\"");
    }

    #[test]
    fn etf_sorts_before_stock() {
        let mut cats = vec![Category::Stock, Category::Etf];
        cats.sort();
        assert_eq!(cats, vec![Category::Etf, Category::Stock]);
    }
}
