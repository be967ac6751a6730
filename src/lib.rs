//! # Erbench
//!
//! A benchmarking harness for end-to-end entity-resolution pipelines.
//!
//! Given one or two record collections and a ground-truth set of known
//! duplicates, the harness runs a configurable sequence of pluggable stages
//! (candidate generation, block and comparison refinement, pairwise scoring,
//! clustering) and derives precision/recall/F-measure from the intermediate
//! and final pipeline outputs. A grid-search driver sweeps a six-dimensional
//! parameter space with one isolated pipeline run per configuration.
//!
//! The concrete resolution algorithms are external collaborators behind the
//! [`stage`] traits; the harness owns ground-truth bookkeeping, metric
//! derivation, orchestration, and result reporting.

pub mod blocks;
pub mod clusters;
pub mod config;
pub mod dsu;
pub mod error;
pub mod grid;
pub mod model;
pub mod pipeline;
pub mod propagation;
pub mod report;
pub mod stage;
pub mod test_support;

// Re-export main types for convenience
pub use config::{HarnessConfig, SweepConfig};
pub use error::{Error, Result};
pub use grid::{GridCell, GridSearch, GridSpec, ResultRow, RunOutcome};
pub use model::{
    BlockId, CandidateBlock, ClusterId, ComparisonPair, DuplicateFact, EntityId, Membership,
    MetricResult, ResolvedCluster, ScoredPair,
};
pub use pipeline::{Pipeline, PipelineReport};
pub use propagation::DuplicatePropagation;
pub use report::{CsvSink, MemorySink, ResultSink};

/// Main API for pipeline benchmarking.
///
/// Owns the record collections (identifiers only — attributes never reach
/// the core), the ground-truth oracle, and the per-run configuration. Single
/// runs go through [`Harness::run_pipeline`], parameter sweeps through
/// [`Harness::grid_search`].
#[derive(Debug)]
pub struct Harness {
    d1: Vec<EntityId>,
    d2: Option<Vec<EntityId>>,
    oracle: DuplicatePropagation,
    config: HarnessConfig,
}

impl Harness {
    /// Create a harness over one or two collections and their ground truth.
    ///
    /// The primary collection must be non-empty; a bilateral oracle requires
    /// a non-empty secondary collection as well.
    pub fn new(
        d1: Vec<EntityId>,
        d2: Option<Vec<EntityId>>,
        oracle: DuplicatePropagation,
    ) -> Result<Self> {
        Self::with_config(d1, d2, oracle, HarnessConfig::default())
    }

    /// Create a harness with an explicit run configuration.
    pub fn with_config(
        d1: Vec<EntityId>,
        d2: Option<Vec<EntityId>>,
        oracle: DuplicatePropagation,
        config: HarnessConfig,
    ) -> Result<Self> {
        if d1.is_empty() {
            return Err(Error::EmptyInput("primary collection D1"));
        }
        if oracle.is_bilateral() && d2.as_ref().map_or(true, |ids| ids.is_empty()) {
            return Err(Error::EmptyInput("secondary collection D2"));
        }
        Ok(Self {
            d1,
            d2,
            oracle,
            config,
        })
    }

    pub fn d1(&self) -> &[EntityId] {
        &self.d1
    }

    pub fn d2(&self) -> Option<&[EntityId]> {
        self.d2.as_deref()
    }

    /// Total ground-truth duplicate count.
    pub fn total_duplicates(&self) -> usize {
        self.oracle.total_duplicates()
    }

    /// Run a single configured pipeline against a fresh oracle state.
    pub fn run_pipeline(&self, pipeline: &Pipeline) -> Result<PipelineReport> {
        let mut oracle = self.oracle.fresh();
        pipeline.run(&self.d1, self.d2.as_deref(), &mut oracle, &self.config)
    }

    /// Sweep a parameter grid, one pipeline run per cell, and emit the
    /// result table to the sink.
    pub fn grid_search<F>(
        &self,
        spec: GridSpec,
        factory: F,
        sweep: SweepConfig,
        sink: &mut dyn ResultSink,
    ) -> Result<Vec<ResultRow>>
    where
        F: Fn(&GridCell) -> anyhow::Result<Pipeline> + Send + Sync,
    {
        let search = GridSearch::new(spec, factory, sweep);
        search.run(&self.d1, self.d2.as_deref(), &self.oracle, sink)
    }
}
