//! CSV directory fetcher.
//!
//! Reads `{dir}/{TICKER}.csv` files with a header row (for example
//! `Date,Open,High,Low,Close,Volume`). Every column is loaded as text and
//! empty fields become nulls, so the file goes through the same validation as
//! a network download.

use super::provider::{FetchError, SeriesFetcher};
use crate::domain::{path_safe, RawSeries, DATE_COLUMN};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvDirFetcher {
    dir: PathBuf,
}

impl CsvDirFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `ticker`.
    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", path_safe(ticker)))
    }
}

/// Leading `YYYY-MM-DD` of a date token, if it has one.
fn row_date(token: &str) -> Option<NaiveDate> {
    let head = token.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

impl SeriesFetcher for CsvDirFetcher {
    fn name(&self) -> &str {
        "csv_dir"
    }

    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, FetchError> {
        let path = self.path_for(ticker);
        if !path.exists() {
            debug!(ticker, path = %path.display(), "no CSV file for ticker");
            return Err(FetchError::no_data(ticker));
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| FetchError::Other(format!("open {}: {e}", path.display())))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| FetchError::ResponseFormatChanged(format!("{}: {e}", path.display())))?
            .iter()
            .map(str::to_string)
            .collect();
        let date_idx = headers.iter().position(|h| h == DATE_COLUMN);

        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record
                .map_err(|e| FetchError::ResponseFormatChanged(format!("{}: {e}", path.display())))?;

            // Rows with a readable date outside the range are skipped; rows with
            // an unreadable date are left for the cleaner to drop.
            if let Some(date) = date_idx.and_then(|i| record.get(i)).and_then(row_date) {
                if date < start || date > end {
                    continue;
                }
            }

            for (i, column) in columns.iter_mut().enumerate() {
                let field = record.get(i).filter(|f| !f.is_empty()).map(str::to_string);
                column.push(field);
            }
        }

        if columns.first().map_or(true, Vec::is_empty) {
            return Err(FetchError::no_data(ticker));
        }

        let frame = DataFrame::new(
            headers
                .iter()
                .zip(columns)
                .map(|(name, values)| Column::from(Series::new(name.as_str().into(), values)))
                .collect(),
        )
        .map_err(|e| FetchError::ResponseFormatChanged(e.to_string()))?;

        Ok(RawSeries::new(ticker, frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn write_csv(dir: &Path, name: &str, body: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn reads_text_columns_with_nulls() {
        let tmp = tempfile::tempdir().unwrap();
        write_csv(
            tmp.path(),
            "SPY.csv",
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,1,2,0.5,1.5,100\n\
             2024-01-03,1.5,2.5,1,,200\n",
        );
        let fetcher = CsvDirFetcher::new(tmp.path());
        let raw = fetcher.fetch("SPY", date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert_eq!(raw.len(), 2);
        let close = raw.frame().column("Close").unwrap();
        assert_eq!(close.null_count(), 1);
        assert_eq!(close.dtype(), &DataType::String);
    }

    #[test]
    fn filters_by_date_range() {
        let tmp = tempfile::tempdir().unwrap();
        write_csv(
            tmp.path(),
            "QQQ.csv",
            "Date,High,Low,Close,Volume\n\
             2023-12-29,2,1,1.5,10\n\
             2024-01-02,2,1,1.5,10\n\
             2024-02-01,2,1,1.5,10\n",
        );
        let fetcher = CsvDirFetcher::new(tmp.path());
        let raw = fetcher.fetch("QQQ", date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(raw.len(), 1);
    }

    #[test]
    fn missing_file_is_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = CsvDirFetcher::new(tmp.path());
        let err = fetcher.fetch("NOPE", date(2024, 1, 1), date(2024, 2, 1)).unwrap_err();
        assert_eq!(err, FetchError::no_data("NOPE"));
    }

    #[test]
    fn header_only_file_is_no_data() {
        let tmp = tempfile::tempdir().unwrap();
        write_csv(tmp.path(), "DIA.csv", "Date,High,Low,Close,Volume\n");
        let fetcher = CsvDirFetcher::new(tmp.path());
        let err = fetcher.fetch("DIA", date(2024, 1, 1), date(2024, 2, 1)).unwrap_err();
        assert_eq!(err, FetchError::no_data("DIA"));
    }

    #[test]
    fn share_class_ticker_maps_to_dashed_file() {
        let fetcher = CsvDirFetcher::new("/data");
        assert_eq!(fetcher.path_for("BRK/B"), PathBuf::from("/data/BRK-B.csv"));
    }
}
