//! # Grid Search
//!
//! Enumerates a six-dimensional parameter space, runs the pipeline once per
//! configuration, and collects exactly one result row per cell.
//!
//! Cells are enumerated in a fixed nested order (windows outermost,
//! clustering thresholds innermost) so the result table is reproducible.
//! Every cell gets its own fresh oracle and its own pipeline instance built
//! by the caller-supplied factory, which makes the sweep embarrassingly
//! parallel: with a concurrency above 1 the cells run on a dedicated rayon
//! pool and the rows are still emitted in generation order.

use crate::config::SweepConfig;
use crate::error::{Error, Result};
use crate::model::{EntityId, MetricResult};
use crate::pipeline::Pipeline;
use crate::propagation::DuplicatePropagation;
use crate::report::ResultSink;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Parameter lists for the six tunable dimensions.
///
/// The Cartesian product is enumerated with the dimensions nested in the
/// declared field order, outermost first.
#[derive(Debug, Clone, Default)]
pub struct GridSpec {
    /// Candidate-generation window sizes.
    pub windows: Vec<u32>,
    /// Block-filter thresholds.
    pub block_filter_thresholds: Vec<f64>,
    /// Representation models, opaque to the core.
    pub representations: Vec<String>,
    /// Similarity metrics, opaque to the core.
    pub similarity_metrics: Vec<String>,
    /// Matching similarity thresholds.
    pub match_thresholds: Vec<f64>,
    /// Clustering similarity thresholds.
    pub clustering_thresholds: Vec<f64>,
}

impl GridSpec {
    /// Number of cells in the full product.
    pub fn len(&self) -> usize {
        self.windows.len()
            * self.block_filter_thresholds.len()
            * self.representations.len()
            * self.similarity_metrics.len()
            * self.match_thresholds.len()
            * self.clustering_thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerate every cell in generation order.
    pub fn cells(&self) -> Vec<GridCell> {
        let mut cells = Vec::with_capacity(self.len());
        let mut index = 0;
        for &window in &self.windows {
            for &block_filter_threshold in &self.block_filter_thresholds {
                for representation in &self.representations {
                    for similarity in &self.similarity_metrics {
                        for &match_threshold in &self.match_thresholds {
                            for &clustering_threshold in &self.clustering_thresholds {
                                cells.push(GridCell {
                                    index,
                                    window,
                                    block_filter_threshold,
                                    representation: representation.clone(),
                                    similarity: similarity.clone(),
                                    match_threshold,
                                    clustering_threshold,
                                });
                                index += 1;
                            }
                        }
                    }
                }
            }
        }
        cells
    }
}

/// One configuration of the parameter space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    /// Position in generation order.
    pub index: usize,
    pub window: u32,
    pub block_filter_threshold: f64,
    pub representation: String,
    pub similarity: String,
    pub match_threshold: f64,
    pub clustering_threshold: f64,
}

/// Result of one cell's run: numeric metrics, or a failure marker that
/// distinguishes "could not run" from "found nothing".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    Metrics(MetricResult),
    Failed { stage: String, message: String },
}

/// One row of the result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub cell: GridCell,
    /// Wall-clock span of the whole run, including pipeline construction.
    pub elapsed: Duration,
    pub outcome: RunOutcome,
}

impl ResultRow {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Failed { .. })
    }

    pub fn metrics(&self) -> Option<&MetricResult> {
        match &self.outcome {
            RunOutcome::Metrics(metrics) => Some(metrics),
            RunOutcome::Failed { .. } => None,
        }
    }
}

/// Grid-search driver: one pipeline run per cell, one row per run.
///
/// The factory builds a pipeline for a cell's parameter values; it is the
/// single data-driven entry point replacing per-variant driver code.
pub struct GridSearch<F>
where
    F: Fn(&GridCell) -> anyhow::Result<Pipeline> + Send + Sync,
{
    spec: GridSpec,
    factory: F,
    config: SweepConfig,
}

impl<F> GridSearch<F>
where
    F: Fn(&GridCell) -> anyhow::Result<Pipeline> + Send + Sync,
{
    pub fn new(spec: GridSpec, factory: F, config: SweepConfig) -> Self {
        Self {
            spec,
            factory,
            config,
        }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Sweep the full parameter space.
    ///
    /// Every cell produces exactly one row — numeric metrics or a failure
    /// marker — and no cell is ever skipped. Rows are appended to the sink
    /// in generation order after the sweep completes, then the sink is
    /// flushed once.
    pub fn run(
        &self,
        d1: &[EntityId],
        d2: Option<&[EntityId]>,
        oracle: &DuplicatePropagation,
        sink: &mut dyn ResultSink,
    ) -> Result<Vec<ResultRow>> {
        if d1.is_empty() {
            return Err(Error::EmptyInput("primary collection D1"));
        }

        let cells = self.spec.cells();
        let rows = if self.config.concurrency <= 1 {
            cells
                .iter()
                .map(|cell| self.run_cell(cell, d1, d2, oracle))
                .collect()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.concurrency)
                .build()
                .map_err(|err| Error::invalid_configuration("sweep", err.to_string()))?;
            // par_iter + collect preserves generation order regardless of
            // completion order
            pool.install(|| {
                cells
                    .par_iter()
                    .map(|cell| self.run_cell(cell, d1, d2, oracle))
                    .collect()
            })
        };

        for row in &rows {
            sink.append(row)?;
        }
        sink.flush()?;

        Ok(rows)
    }

    fn run_cell(
        &self,
        cell: &GridCell,
        d1: &[EntityId],
        d2: Option<&[EntityId]>,
        oracle: &DuplicatePropagation,
    ) -> ResultRow {
        let started = Instant::now();
        let outcome = match (self.factory)(cell) {
            Err(err) => RunOutcome::Failed {
                stage: "configuration".to_string(),
                message: err.to_string(),
            },
            Ok(pipeline) => {
                // Fresh found-state per cell; the fact set stays shared.
                let mut run_oracle = oracle.fresh();
                match pipeline.run(d1, d2, &mut run_oracle, &self.config.harness) {
                    Ok(report) => RunOutcome::Metrics(report.metrics),
                    Err(err) => RunOutcome::Failed {
                        stage: err.stage_name().unwrap_or("pipeline").to_string(),
                        message: err.to_string(),
                    },
                }
            }
        };
        let elapsed = started.elapsed();
        debug!(
            index = cell.index,
            elapsed_ms = elapsed.as_millis() as u64,
            failed = matches!(outcome, RunOutcome::Failed { .. }),
            "grid cell finished"
        );
        ResultRow {
            cell: cell.clone(),
            elapsed,
            outcome,
        }
    }
}
