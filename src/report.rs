//! # Result Sinks
//!
//! Tabular output for sweep results. A sink receives one row per grid cell
//! after the sweep and is flushed once at the end.

use crate::error::Result;
use crate::grid::{ResultRow, RunOutcome};
use std::fs::File;
use std::path::Path;

/// Marker written into the metric columns of a failed run's row.
pub const FAILED_SENTINEL: &str = "failed";

/// Destination for sweep result rows.
pub trait ResultSink {
    /// Append one row to the table.
    fn append(&mut self, row: &ResultRow) -> Result<()>;

    /// Flush the table to its destination.
    fn flush(&mut self) -> Result<()>;
}

/// CSV file sink: a header row plus one record per grid cell with
/// elapsed time, the six parameter values, and the three quality metrics.
pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    /// Create the output file and write the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "elapsed_ms",
            "window",
            "block_filter_threshold",
            "representation",
            "similarity",
            "match_threshold",
            "clustering_threshold",
            "precision",
            "recall",
            "f_measure",
        ])?;
        Ok(Self { writer })
    }
}

impl ResultSink for CsvSink {
    fn append(&mut self, row: &ResultRow) -> Result<()> {
        let cell = &row.cell;
        let (precision, recall, f_measure) = match &row.outcome {
            RunOutcome::Metrics(metrics) => (
                metrics.precision.to_string(),
                metrics.recall.to_string(),
                metrics.f_measure.to_string(),
            ),
            RunOutcome::Failed { .. } => (
                FAILED_SENTINEL.to_string(),
                FAILED_SENTINEL.to_string(),
                FAILED_SENTINEL.to_string(),
            ),
        };
        self.writer.write_record([
            row.elapsed.as_millis().to_string(),
            cell.window.to_string(),
            cell.block_filter_threshold.to_string(),
            cell.representation.clone(),
            cell.similarity.clone(),
            cell.match_threshold.to_string(),
            cell.clustering_threshold.to_string(),
            precision,
            recall,
            f_measure,
        ])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// In-memory sink for tests and programmatic consumers.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Vec<ResultRow>,
    flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Number of times the sink was flushed.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl ResultSink for MemorySink {
    fn append(&mut self, row: &ResultRow) -> Result<()> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
