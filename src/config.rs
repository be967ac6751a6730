//! # Configuration
//!
//! Runtime knobs for pipeline runs and grid sweeps. Verbosity only changes
//! reporting volume, never computed metrics.

/// Configuration for a single pipeline run.
#[derive(Debug, Clone, Default)]
pub struct HarnessConfig {
    /// Emit per-stage diagnostic evaluations through tracing.
    pub verbose: bool,
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-stage diagnostics enabled.
    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

/// Configuration for a grid sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Worker threads for the sweep. 1 runs cells sequentially.
    pub concurrency: usize,
    /// Per-run configuration handed to every pipeline.
    pub harness: HarnessConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            harness: HarnessConfig::default(),
        }
    }
}

impl SweepConfig {
    /// One cell at a time, in generation order.
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Up to `workers` cells concurrently. Result rows keep generation
    /// order regardless of completion order.
    pub fn parallel(workers: usize) -> Self {
        Self {
            concurrency: workers.max(1),
            harness: HarnessConfig::default(),
        }
    }

    pub fn with_harness(mut self, harness: HarnessConfig) -> Self {
        self.harness = harness;
        self
    }
}
