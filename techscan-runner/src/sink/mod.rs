//! Result sinks: where analysis tables and charts end up.
//!
//! A sink receives a finished [`AnalysisResult`] and writes two artifacts per
//! (category, ticker): the indicator table and a chart. Each write returns an
//! [`Ack`] with the location and a BLAKE3 digest of the bytes written.

pub mod chart;
pub mod fs;
pub mod memory;
pub mod table;

pub use chart::{render_chart, ChartSize};
pub use fs::FsSink;
pub use memory::MemorySink;
pub use table::{encode_table, table_columns};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use techscan_core::domain::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("writing {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("encoding table: {0}")]
    Encode(String),

    #[error("rendering chart: {0}")]
    Render(String),

    #[error("sink rejected write: {0}")]
    Rejected(String),
}

/// Receipt for an accepted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub location: String,
    pub bytes: usize,
    /// BLAKE3 hex digest of the artifact content.
    pub digest: String,
}

impl Ack {
    pub fn for_bytes(location: impl Into<String>, content: &[u8]) -> Self {
        Self {
            location: location.into(),
            bytes: content.len(),
            digest: blake3::hash(content).to_hex().to_string(),
        }
    }
}

/// Destination for per-ticker artifacts.
///
/// Each (category, ticker) has one table and one chart location, overwritten
/// on every run.
pub trait ResultSink: Send + Sync {
    fn name(&self) -> &str;

    fn write_table(&self, result: &AnalysisResult) -> Result<Ack, SinkError>;

    fn write_chart(&self, result: &AnalysisResult) -> Result<Ack, SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_digest_is_content_addressed() {
        let a = Ack::for_bytes("a", b"Date,Close\n");
        let b = Ack::for_bytes("b", b"Date,Close\n");
        assert_eq!(a.digest, b.digest);
        assert_eq!(a.bytes, 11);
        assert_ne!(a.digest, Ack::for_bytes("a", b"Date\n").digest);
    }
}
