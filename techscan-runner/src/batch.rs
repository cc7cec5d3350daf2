//! Batch runner: the pipeline over a whole universe.
//!
//! Tickers run sequentially when `workers == 1`, otherwise on a rayon pool of
//! `workers` threads. One ticker's failure never stops the others. The report
//! is keyed by ticker, so its content does not depend on completion order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use techscan_core::domain::{Category, TickerUniverse};

use crate::pipeline::{AnalysisPipeline, PipelineOutcome};

pub const REPORT_FILE: &str = "batch_report.json";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("building worker pool: {0}")]
    Pool(String),
}

/// Progress callbacks, invoked from worker threads.
pub trait BatchProgress: Send + Sync {
    fn on_start(&self, ticker: &str, category: Category, index: usize, total: usize);

    fn on_finish(&self, outcome: &PipelineOutcome, index: usize, total: usize);

    fn on_batch_complete(&self, report: &BatchReport);
}

/// Logs progress through `tracing`.
pub struct LogProgress;

impl BatchProgress for LogProgress {
    fn on_start(&self, ticker: &str, category: Category, index: usize, total: usize) {
        info!(ticker, category = %category, "[{}/{}] analyzing", index + 1, total);
    }

    fn on_finish(&self, outcome: &PipelineOutcome, index: usize, total: usize) {
        match outcome.reason() {
            None => info!(
                ticker = %outcome.ticker,
                rows = outcome.rows,
                "[{}/{}] done",
                index + 1,
                total
            ),
            Some(reason) => warn!(
                ticker = %outcome.ticker,
                reason = reason.kind(),
                "[{}/{}] failed: {}",
                index + 1,
                total,
                reason
            ),
        }
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        for (category, counts) in report.counts_by_category() {
            info!(
                category = %category,
                succeeded = counts.succeeded,
                failed = counts.failed,
                "category complete"
            );
        }
    }
}

/// Discards all progress events.
pub struct NoProgress;

impl BatchProgress for NoProgress {
    fn on_start(&self, _: &str, _: Category, _: usize, _: usize) {}
    fn on_finish(&self, _: &PipelineOutcome, _: usize, _: usize) {}
    fn on_batch_complete(&self, _: &BatchReport) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub succeeded: usize,
    pub failed: usize,
}

/// Outcomes of one batch, keyed by ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: BTreeMap<String, PipelineOutcome>,
}

impl BatchReport {
    pub fn insert(&mut self, outcome: PipelineOutcome) {
        self.outcomes.insert(outcome.ticker.clone(), outcome);
    }

    pub fn get(&self, ticker: &str) -> Option<&PipelineOutcome> {
        self.outcomes.get(ticker)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_done()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Failures whose reason has the given kind, e.g. `"NoData"`.
    pub fn failures_of_kind(&self, kind: &str) -> usize {
        self.outcomes
            .values()
            .filter(|o| o.reason().is_some_and(|r| r.kind() == kind))
            .count()
    }

    pub fn counts_by_category(&self) -> BTreeMap<Category, CategoryCounts> {
        let mut counts: BTreeMap<Category, CategoryCounts> = BTreeMap::new();
        for outcome in self.outcomes.values() {
            let entry = counts.entry(outcome.category).or_default();
            if outcome.is_done() {
                entry.succeeded += 1;
            } else {
                entry.failed += 1;
            }
        }
        counts
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize batch report")
    }

    /// Write `batch_report.json` under `dir` and return its path.
    pub fn save_json(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(REPORT_FILE);
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        std::fs::write(&path, self.to_json()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse batch report")
    }
}

pub struct BatchRunner {
    pipeline: AnalysisPipeline,
    workers: usize,
}

impl BatchRunner {
    pub fn new(pipeline: AnalysisPipeline, workers: usize) -> Self {
        Self {
            pipeline,
            workers: workers.max(1),
        }
    }

    pub fn pipeline(&self) -> &AnalysisPipeline {
        &self.pipeline
    }

    pub fn run(
        &self,
        universe: &TickerUniverse,
        progress: &dyn BatchProgress,
    ) -> Result<BatchReport, BatchError> {
        let jobs: Vec<(usize, &str, Category)> = universe
            .iter()
            .enumerate()
            .map(|(i, e)| (i, e.ticker.as_str(), e.category))
            .collect();
        let total = jobs.len();

        let run_one = |&(index, ticker, category): &(usize, &str, Category)| {
            progress.on_start(ticker, category, index, total);
            let outcome = self.pipeline.run(ticker, category);
            progress.on_finish(&outcome, index, total);
            outcome
        };

        let outcomes: Vec<PipelineOutcome> = if self.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .thread_name(|i| format!("techscan-worker-{i}"))
                .build()
                .map_err(|e| BatchError::Pool(e.to_string()))?;
            pool.install(|| jobs.par_iter().map(run_one).collect())
        } else {
            jobs.iter().map(run_one).collect()
        };

        let mut report = BatchReport::default();
        for outcome in outcomes {
            report.insert(outcome);
        }
        progress.on_batch_complete(&report);
        Ok(report)
    }
}
