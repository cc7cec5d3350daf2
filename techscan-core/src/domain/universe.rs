//! Ticker universe: one shared list of symbols, each tagged with a category.
//!
//! The universe can be loaded from a TOML file with one array per category:
//!
//! ```toml
//! ETF = ["SPY", "QQQ"]
//! Stock = ["AAPL", "MSFT"]
//! ```
//!
//! Tickers are unique across the whole universe; the first occurrence wins.
//! Uniqueness is by [`path_safe`] form, so `BRK/B` and `BRK-B` count as the
//! same ticker and can never share an output directory.

use super::category::Category;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

const DEFAULT_ETFS: &[&str] = &[
    "QQQ", "QQQM", "VOO", "VTI", "SPY", "IVV", "DIA", "VT", "VXUS", "VUG", "VO", "XLF", "BND",
    "VWO", "DIAU", "QQQX",
];

const DEFAULT_STOCKS: &[&str] = &[
    "TSLA", "AAPL", "AMZN", "AMD", "NKE", "V", "TSM", "INTC", "MSFT", "ADBE", "GOOG", "MU",
    "NVDA", "MCD", "SMCI", "BE", "PLUG", "APD", "FCEL", "BLDP", "KO", "PLTR", "SOUN", "META",
    "CFLT", "AVGO", "QCOM", "IBKR", "LULU", "DDOG", "ZS", "MDB", "NFLX", "ORLY", "BKNG", "ASML",
    "INTU", "TPL", "URI", "UNH", "ASX", "DJCO", "PLBY", "ORCL", "PFE", "MRK", "TPR", "RH",
    "MSTR", "PGR", "TER", "MRVL", "ANET", "LW", "CLS", "CIEN", "INTU", "IBM", "BRK/B", "MELI",
    "COIN", "CRWD", "FICO", "NOW", "HUBS", "IT", "MA", "ROP", "MPWR", "KLAC", "TYL", "MTD",
    "LLY", "REGN", "GHC", "MUSA", "CVCO", "MSCI", "GS", "AMP", "LNG", "PNRG", "TRGP", "PH",
    "LII", "SPOT", "CHTR", "MLM", "NEU", "LIN", "COST", "CASY", "SAM", "EQIX", "PSA", "ESS",
    "CEG", "VST", "ATO", "QUBT", "TNXP", "PG", "JNJ", "ABBV",
];

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file {path}: {message}")]
    Io { path: String, message: String },

    #[error("parse universe TOML: {0}")]
    Parse(String),

    #[error("serialize universe: {0}")]
    Serialize(String),
}

/// A ticker and the category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerEntry {
    pub ticker: String,
    pub category: Category,
}

/// On-disk layout: one array per category.
#[derive(Debug, Default, Serialize, Deserialize)]
struct UniverseFile {
    #[serde(rename = "ETF", default)]
    etf: Vec<String>,
    #[serde(rename = "Stock", default)]
    stock: Vec<String>,
}

/// The full set of tickers to analyze, in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerUniverse {
    entries: Vec<TickerEntry>,
}

impl TickerUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (ticker, category) pairs. Duplicate tickers are dropped.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: AsRef<str>,
    {
        let mut universe = Self::new();
        for (ticker, category) in pairs {
            universe.push(ticker.as_ref(), category);
        }
        universe
    }

    /// Add a ticker. Returns false if it was blank or its path-safe form is
    /// already taken.
    pub fn push(&mut self, ticker: &str, category: Category) -> bool {
        let ticker = normalize_ticker(ticker);
        if ticker.is_empty() {
            return false;
        }
        if let Some(existing) = self.path_owner(&ticker) {
            if existing != ticker {
                warn!(ticker = %ticker, existing, "ticker shares an output path, skipped");
            }
            return false;
        }
        self.entries.push(TickerEntry { ticker, category });
        true
    }

    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path).map_err(|e| UniverseError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string. ETFs are listed before stocks.
    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        let file: UniverseFile =
            toml::from_str(content).map_err(|e| UniverseError::Parse(e.to_string()))?;
        let etfs = file.etf.into_iter().map(|t| (t, Category::Etf));
        let stocks = file.stock.into_iter().map(|t| (t, Category::Stock));
        Ok(Self::from_pairs(etfs.chain(stocks)))
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, UniverseError> {
        let file = UniverseFile {
            etf: self.tickers(Category::Etf).into_iter().map(String::from).collect(),
            stock: self.tickers(Category::Stock).into_iter().map(String::from).collect(),
        };
        toml::to_string_pretty(&file).map_err(|e| UniverseError::Serialize(e.to_string()))
    }

    /// The built-in US universe: broad-market ETFs followed by individual equities.
    pub fn default_us() -> Self {
        let etfs = DEFAULT_ETFS.iter().map(|t| (*t, Category::Etf));
        let stocks = DEFAULT_STOCKS.iter().map(|t| (*t, Category::Stock));
        Self::from_pairs(etfs.chain(stocks))
    }

    pub fn entries(&self) -> &[TickerEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.entries.iter().any(|e| e.ticker == ticker)
    }

    /// The entry whose output path `ticker` would land on, if any.
    fn path_owner(&self, ticker: &str) -> Option<&str> {
        let safe = path_safe(ticker);
        self.entries
            .iter()
            .find(|e| path_safe(&e.ticker) == safe)
            .map(|e| e.ticker.as_str())
    }

    /// Tickers belonging to one category, in run order.
    pub fn tickers(&self, category: Category) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.ticker.as_str())
            .collect()
    }

    pub fn category_of(&self, ticker: &str) -> Option<Category> {
        let ticker = normalize_ticker(ticker);
        self.entries
            .iter()
            .find(|e| e.ticker == ticker)
            .map(|e| e.category)
    }

    pub fn count(&self, category: Category) -> usize {
        self.entries.iter().filter(|e| e.category == category).count()
    }

    /// Keep only one category.
    pub fn only(&self, category: Category) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| e.category == category)
                .cloned()
                .collect(),
        }
    }

    /// Keep only the named tickers, preserving universe order.
    pub fn select<S: AsRef<str>>(&self, tickers: &[S]) -> Self {
        let wanted: Vec<String> = tickers.iter().map(|t| normalize_ticker(t.as_ref())).collect();
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| wanted.contains(&e.ticker))
                .cloned()
                .collect(),
        }
    }
}

fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_ascii_uppercase()
}

/// Map a ticker to a name safe for use as a single path component.
///
/// `BRK/B` becomes `BRK-B`, which is also the spelling Yahoo Finance expects.
pub fn path_safe(ticker: &str) -> String {
    ticker
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}
