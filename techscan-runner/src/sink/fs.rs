//! Filesystem sink.
//!
//! Layout under the output root:
//!
//! ```text
//! {root}/ETF/SPY/SPY_indicators.csv
//! {root}/ETF/SPY/SPY_chart.txt
//! {root}/Stocks/BRK-B/BRK-B_indicators.csv
//! ```
//!
//! Writes are atomic: the content goes to a hidden temp file in the same
//! directory, which is then renamed over the target.

use std::fs;
use std::path::{Path, PathBuf};

use techscan_core::domain::{path_safe, AnalysisResult, Category};
use tracing::debug;

use super::chart::{render_chart, ChartSize};
use super::table::encode_table;
use super::{Ack, ResultSink, SinkError};

#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
    chart_size: ChartSize,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chart_size: ChartSize::default(),
        }
    }

    pub fn with_chart_size(mut self, size: ChartSize) -> Self {
        self.chart_size = size;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by one (category, ticker).
    pub fn ticker_dir(&self, category: Category, ticker: &str) -> PathBuf {
        self.root.join(category.dir_name()).join(path_safe(ticker))
    }

    pub fn table_path(&self, category: Category, ticker: &str) -> PathBuf {
        let safe = path_safe(ticker);
        self.ticker_dir(category, ticker)
            .join(format!("{safe}_indicators.csv"))
    }

    pub fn chart_path(&self, category: Category, ticker: &str) -> PathBuf {
        let safe = path_safe(ticker);
        self.ticker_dir(category, ticker).join(format!("{safe}_chart.txt"))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> SinkError {
    SinkError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Write `content` to `path` via a temp file and rename.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), SinkError> {
    let dir = path
        .parent()
        .ok_or_else(|| SinkError::Rejected(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(".{file_name}.tmp"));
    fs::write(&tmp_path, content).map_err(|e| io_error(&tmp_path, e))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error(path, e)
    })
}

impl ResultSink for FsSink {
    fn name(&self) -> &str {
        "fs"
    }

    fn write_table(&self, result: &AnalysisResult) -> Result<Ack, SinkError> {
        let path = self.table_path(result.category, result.ticker());
        let content = encode_table(result)?;
        write_atomic(&path, &content)?;
        debug!(ticker = %result.ticker(), path = %path.display(), "table written");
        Ok(Ack::for_bytes(path.display().to_string(), &content))
    }

    fn write_chart(&self, result: &AnalysisResult) -> Result<Ack, SinkError> {
        let path = self.chart_path(result.category, result.ticker());
        let content = render_chart(result, self.chart_size)?;
        write_atomic(&path, content.as_bytes())?;
        debug!(ticker = %result.ticker(), path = %path.display(), "chart written");
        Ok(Ack::for_bytes(path.display().to_string(), content.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::result_with_rows;

    #[test]
    fn paths_are_namespaced_by_category() {
        let sink = FsSink::new("/out");
        assert_eq!(
            sink.table_path(Category::Etf, "SPY"),
            PathBuf::from("/out/ETF/SPY/SPY_indicators.csv")
        );
        assert_eq!(
            sink.chart_path(Category::Stock, "BRK/B"),
            PathBuf::from("/out/Stocks/BRK-B/BRK-B_chart.txt")
        );
    }

    #[test]
    fn writes_table_and_chart() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());
        let result = result_with_rows(40);

        let table = sink.write_table(&result).unwrap();
        let chart = sink.write_chart(&result).unwrap();

        let table_path = sink.table_path(Category::Etf, "SYN");
        let on_disk = fs::read(&table_path).unwrap();
        assert_eq!(table.bytes, on_disk.len());
        assert_eq!(table.digest, blake3::hash(&on_disk).to_hex().to_string());
        assert!(sink.chart_path(Category::Etf, "SYN").exists());
        assert!(chart.bytes > 0);
    }

    #[test]
    fn rewrite_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsSink::new(dir.path());
        let result = result_with_rows(25);

        let first = sink.write_table(&result).unwrap();
        let second = sink.write_table(&result).unwrap();
        assert_eq!(first, second);

        let entries: Vec<_> = fs::read_dir(sink.ticker_dir(Category::Etf, "SYN"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["SYN_indicators.csv".to_string()]);
    }
}
