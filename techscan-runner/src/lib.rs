//! techscan runner: analysis orchestration on top of `techscan-core`.
//!
//! - Run configuration loaded from TOML
//! - Per-ticker pipeline state machine with bounded fetch and sink calls
//! - Batch runner over a ticker universe, sequential or on a rayon pool
//! - Result sinks: CSV indicator tables and text charts on disk or in memory

pub mod batch;
pub mod config;
pub mod pipeline;
pub mod sink;
pub mod timeout;

pub use batch::{
    BatchError, BatchProgress, BatchReport, BatchRunner, CategoryCounts, LogProgress, NoProgress,
    REPORT_FILE,
};
pub use config::{AnalysisConfig, ConfigError, SourceConfig, SourceKind, DEFAULT_OUTPUT_DIR};
pub use pipeline::{
    AnalysisPipeline, FailureReason, PipelineOptions, PipelineOutcome, PipelineState,
};
pub use sink::{Ack, FsSink, MemorySink, ResultSink, SinkError};
pub use timeout::{call_with_timeout, TimeoutError};
