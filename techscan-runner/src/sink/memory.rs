//! In-memory sink for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use techscan_core::domain::{AnalysisResult, Category};

use super::chart::{render_chart, ChartSize};
use super::table::encode_table;
use super::{Ack, ResultSink, SinkError};

type Key = (Category, String);

/// Keeps encoded artifacts in memory, keyed by (category, ticker).
///
/// Failures and delays can be switched on to exercise pipeline error paths.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<BTreeMap<Key, Vec<u8>>>,
    charts: Mutex<BTreeMap<Key, String>>,
    fail_tables: AtomicBool,
    fail_charts: AtomicBool,
    delay: Option<Duration>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every write.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_tables(&self, fail: bool) {
        self.fail_tables.store(fail, Ordering::SeqCst);
    }

    pub fn fail_charts(&self, fail: bool) {
        self.fail_charts.store(fail, Ordering::SeqCst);
    }

    pub fn table(&self, category: Category, ticker: &str) -> Option<Vec<u8>> {
        self.tables
            .lock()
            .ok()?
            .get(&(category, ticker.to_string()))
            .cloned()
    }

    pub fn chart(&self, category: Category, ticker: &str) -> Option<String> {
        self.charts
            .lock()
            .ok()?
            .get(&(category, ticker.to_string()))
            .cloned()
    }

    pub fn table_count(&self) -> usize {
        self.tables.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn chart_count(&self) -> usize {
        self.charts.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn pause(&self) {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
    }
}

fn location(result: &AnalysisResult, kind: &str) -> String {
    format!("memory://{}/{}/{kind}", result.category.dir_name(), result.ticker())
}

fn poisoned() -> SinkError {
    SinkError::Rejected("memory sink lock poisoned".into())
}

impl ResultSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn write_table(&self, result: &AnalysisResult) -> Result<Ack, SinkError> {
        self.pause();
        if self.fail_tables.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected("table writes disabled".into()));
        }
        let content = encode_table(result)?;
        let ack = Ack::for_bytes(location(result, "table"), &content);
        self.tables
            .lock()
            .map_err(|_| poisoned())?
            .insert((result.category, result.ticker().to_string()), content);
        Ok(ack)
    }

    fn write_chart(&self, result: &AnalysisResult) -> Result<Ack, SinkError> {
        self.pause();
        if self.fail_charts.load(Ordering::SeqCst) {
            return Err(SinkError::Render("chart rendering disabled".into()));
        }
        let content = render_chart(result, ChartSize::default())?;
        let ack = Ack::for_bytes(location(result, "chart"), content.as_bytes());
        self.charts
            .lock()
            .map_err(|_| poisoned())?
            .insert((result.category, result.ticker().to_string()), content);
        Ok(ack)
    }
}
