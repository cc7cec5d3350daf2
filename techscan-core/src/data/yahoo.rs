//! Yahoo Finance fetcher.
//!
//! Fetches daily OHLCV rows from Yahoo's v8 chart API, with bounded retries
//! and exponential backoff. Missing quote values are kept as nulls so the
//! cleaner can fill them.
//!
//! A fetcher built with [`YahooFetcher::bounded`] fits every request, backoff
//! and `Retry-After` wait inside one total budget. It gives up rather than
//! start an attempt that could finish past the budget.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The CSV directory fetcher is the fallback when Yahoo is unavailable.

use super::provider::{FetchError, SeriesFetcher};
use crate::domain::{path_safe, RawSeries, DATE_COLUMN};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Column-oriented rows parsed from one chart response.
#[derive(Debug, Default)]
struct ChartRows {
    dates: Vec<String>,
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

impl ChartRows {
    fn into_frame(self) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            Column::from(Series::new(DATE_COLUMN.into(), self.dates)),
            Column::from(Series::new("Open".into(), self.open)),
            Column::from(Series::new("High".into(), self.high)),
            Column::from(Series::new("Low".into(), self.low)),
            Column::from(Series::new("Close".into(), self.close)),
            Column::from(Series::new("Volume".into(), self.volume)),
        ])
    }
}

/// Yahoo Finance fetcher.
pub struct YahooFetcher {
    client: reqwest::blocking::Client,
    request_timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
    budget: Option<Duration>,
}

impl YahooFetcher {
    pub fn new(request_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            request_timeout,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            budget: None,
        })
    }

    /// A fetcher whose whole `fetch`, retries included, takes at most `total`.
    ///
    /// The backoff schedule is reserved first; the rest is split evenly across
    /// the `max_retries + 1` requests.
    pub fn bounded(
        total: Duration,
        max_retries: u32,
        base_delay: Duration,
    ) -> Result<Self, FetchError> {
        let backoff = base_delay * (2u32.saturating_pow(max_retries) - 1);
        let per_request = total.saturating_sub(backoff) / (max_retries + 1);
        if per_request.is_zero() {
            return Err(FetchError::Other(format!(
                "fetch budget {total:?} leaves no time per request"
            )));
        }
        let mut fetcher = Self::new(per_request)?.with_retries(max_retries, base_delay);
        fetcher.budget = Some(total);
        Ok(fetcher)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Wait before retry number `attempt`, or `None` when the attempt could
    /// not finish inside the budget. A server `Retry-After` longer than the
    /// backoff is honored.
    fn retry_delay(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        elapsed: Duration,
    ) -> Option<Duration> {
        let backoff = self.base_delay * 2u32.saturating_pow(attempt - 1);
        let delay = retry_after.map_or(backoff, |wait| wait.max(backoff));
        match self.budget {
            Some(budget) if elapsed + delay + self.request_timeout > budget => None,
            _ => Some(delay),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Build the chart API URL for a ticker and date range.
    fn chart_url(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp()
            - 1;
        let symbol = path_safe(ticker);
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    /// Parse the chart API response into columns.
    fn parse_response(ticker: &str, resp: ChartResponse) -> Result<ChartRows, FetchError> {
        let result = match resp.chart.result {
            Some(result) => result,
            None => {
                return Err(match resp.chart.error {
                    Some(err) if err.code == "Not Found" => FetchError::no_data(ticker),
                    Some(err) => FetchError::ResponseFormatChanged(format!(
                        "{}: {}",
                        err.code, err.description
                    )),
                    None => FetchError::ResponseFormatChanged("empty result with no error".into()),
                });
            }
        };

        let data = match result.into_iter().next() {
            Some(data) => data,
            None => return Err(FetchError::no_data(ticker)),
        };

        // A listed ticker with no trades in range comes back without timestamps.
        let timestamps = match data.timestamp {
            Some(ts) if !ts.is_empty() => ts,
            _ => return Err(FetchError::no_data(ticker)),
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ResponseFormatChanged("no quote data".into()))?;

        let mut rows = ChartRows::default();
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| FetchError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Rows with no values at all are non-trading days.
            if [open, high, low, close, volume].iter().all(Option::is_none) {
                continue;
            }

            rows.dates.push(date.format("%Y-%m-%d").to_string());
            rows.open.push(open);
            rows.high.push(high);
            rows.low.push(low);
            rows.close.push(close);
            rows.volume.push(volume);
        }

        if rows.dates.is_empty() {
            return Err(FetchError::no_data(ticker));
        }

        Ok(rows)
    }

    fn fetch_with_retry(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ChartRows, FetchError> {
        let url = Self::chart_url(ticker, start, end);
        let started = Instant::now();
        let mut last_error = None;
        let mut retry_after = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let Some(delay) = self.retry_delay(attempt, retry_after.take(), started.elapsed())
                else {
                    debug!(ticker, attempt, "fetch budget spent, not retrying");
                    break;
                };
                debug!(ticker, attempt, ?delay, "retrying Yahoo request");
                std::thread::sleep(delay);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(FetchError::no_data(ticker));
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        let retry_after_secs = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        warn!(ticker, retry_after_secs, "rate limited by Yahoo");
                        retry_after = Some(Duration::from_secs(retry_after_secs));
                        last_error = Some(FetchError::RateLimited { retry_after_secs });
                        continue;
                    }

                    if !status.is_success() {
                        last_error = Some(FetchError::Other(format!("HTTP {status} for {ticker}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        FetchError::ResponseFormatChanged(format!(
                            "failed to parse response for {ticker}: {e}"
                        ))
                    })?;

                    return Self::parse_response(ticker, chart);
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(FetchError::Timeout(self.request_timeout));
                }
                Err(e) if e.is_connect() => {
                    last_error = Some(FetchError::NetworkUnreachable(e.to_string()));
                }
                Err(e) => return Err(FetchError::NetworkUnreachable(e.to_string())),
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Other("max retries exceeded".into())))
    }
}

impl SeriesFetcher for YahooFetcher {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, FetchError> {
        let rows = self.fetch_with_retry(ticker, start, end)?;
        let frame = rows
            .into_frame()
            .map_err(|e| FetchError::ResponseFormatChanged(e.to_string()))?;
        Ok(RawSeries::new(ticker, frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ChartRows, FetchError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooFetcher::parse_response("TEST", resp)
    }

    fn bounded() -> YahooFetcher {
        YahooFetcher::bounded(Duration::from_secs(60), 2, Duration::from_millis(500)).unwrap()
    }

    #[test]
    fn bounded_fetcher_reserves_backoff_before_splitting() {
        assert_eq!(bounded().request_timeout(), Duration::from_millis(19_500));
    }

    #[test]
    fn every_retry_fits_the_budget() {
        let f = bounded();
        // Two timed-out requests plus backoff still leave room for the last one.
        assert_eq!(
            f.retry_delay(1, None, Duration::from_millis(19_500)),
            Some(Duration::from_millis(500))
        );
        assert_eq!(
            f.retry_delay(2, None, Duration::from_millis(39_500)),
            Some(Duration::from_secs(1))
        );
        assert_eq!(f.retry_delay(2, None, Duration::from_secs(41)), None);
    }

    #[test]
    fn retry_after_is_honored_or_ends_the_fetch() {
        let f = bounded();
        assert_eq!(
            f.retry_delay(1, Some(Duration::from_secs(3)), Duration::from_secs(1)),
            Some(Duration::from_secs(3))
        );
        assert_eq!(
            f.retry_delay(1, Some(Duration::from_secs(60)), Duration::from_secs(1)),
            None
        );
    }

    #[test]
    fn budget_too_small_for_the_schedule_is_rejected() {
        let tight = YahooFetcher::bounded(Duration::from_secs(1), 3, Duration::from_millis(500));
        assert!(tight.is_err());
    }

    #[test]
    fn unbounded_fetcher_always_retries() {
        let f = YahooFetcher::new(Duration::from_secs(5)).unwrap();
        assert_eq!(
            f.retry_delay(3, Some(Duration::from_secs(120)), Duration::from_secs(600)),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn parses_quotes_and_keeps_nulls() {
        let rows = parse(
            r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"open":[1.0,2.0,null],"high":[1.5,2.5,3.5],
            "low":[0.5,1.5,2.5],"close":[1.2,null,3.2],"volume":[100,200,300]}]}}],
            "error":null}}"#,
        )
        .unwrap();
        assert_eq!(rows.dates, vec!["2024-01-02", "2024-01-03", "2024-01-04"]);
        assert_eq!(rows.close, vec![Some(1.2), None, Some(3.2)]);
        assert_eq!(rows.volume[2], Some(300.0));
        let df = rows.into_frame().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.column("Close").unwrap().null_count(), 1);
    }

    #[test]
    fn all_null_rows_are_skipped() {
        let rows = parse(
            r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{"open":[1.0,null],"high":[1.5,null],
            "low":[0.5,null],"close":[1.2,null],"volume":[100,null]}]}}],"error":null}}"#,
        )
        .unwrap();
        assert_eq!(rows.dates.len(), 1);
    }

    #[test]
    fn not_found_is_no_data() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found",
            "description":"No data found, symbol may be delisted"}}}"#,
        )
        .err()
        .unwrap();
        assert_eq!(err, FetchError::no_data("TEST"));
    }

    #[test]
    fn missing_timestamps_is_no_data() {
        let err = parse(
            r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#,
        )
        .err()
        .unwrap();
        assert_eq!(err, FetchError::no_data("TEST"));
    }

    #[test]
    fn other_errors_are_format_changes() {
        let err = parse(r#"{"chart":{"result":null,"error":{"code":"Bad","description":"x"}}}"#)
            .err()
            .unwrap();
        assert!(matches!(err, FetchError::ResponseFormatChanged(_)));
    }

    #[test]
    fn url_uses_dash_for_share_classes() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let url = YahooFetcher::chart_url("BRK/B", start, end);
        assert!(url.contains("/chart/BRK-B?"));
        assert!(url.contains("period1=1704067200"));
    }
}
