//! # Pipeline Orchestrator
//!
//! Runs one complete configuration through the five ordered stage slots:
//! candidate generation, block refinement (zero or more), comparison
//! refinement (zero or more), pairwise scoring, clustering.
//!
//! The orchestrator holds no algorithmic logic. It sequences stages, captures
//! wall-clock timings, and invokes the performance evaluators — resetting the
//! oracle's found-state immediately before each evaluator call. That ordering
//! and reset discipline is what keeps metrics from leaking across evaluation
//! points and across grid cells.

use crate::blocks::{self, BlocksMetrics};
use crate::clusters;
use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::model::{EntityId, MetricResult};
use crate::propagation::DuplicatePropagation;
use crate::stage::{BlockRefinement, CandidateGeneration, Clustering, PairScoring};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Wall-clock span of one stage call.
#[derive(Debug, Clone)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed: Duration,
}

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Cluster-level quality metrics; the run's result.
    pub metrics: MetricResult,
    /// Per-stage timings in execution order.
    pub stage_timings: Vec<StageTiming>,
    /// Block-level diagnostics after generation and each refinement stage.
    /// Populated only in verbose mode.
    pub block_diagnostics: Vec<BlocksMetrics>,
}

/// One configured end-to-end pipeline.
pub struct Pipeline {
    generator: Box<dyn CandidateGeneration>,
    block_refiners: Vec<Box<dyn BlockRefinement>>,
    comparison_refiners: Vec<Box<dyn BlockRefinement>>,
    scorer: Box<dyn PairScoring>,
    clusterer: Box<dyn Clustering>,
    clustering_threshold: f64,
}

impl Pipeline {
    /// Assemble a pipeline from its mandatory slots. Refiners are optional
    /// and added with the `with_*` builders.
    pub fn new(
        generator: Box<dyn CandidateGeneration>,
        scorer: Box<dyn PairScoring>,
        clusterer: Box<dyn Clustering>,
        clustering_threshold: f64,
    ) -> Self {
        Self {
            generator,
            block_refiners: Vec::new(),
            comparison_refiners: Vec::new(),
            scorer,
            clusterer,
            clustering_threshold,
        }
    }

    /// Append a block-granular refinement stage.
    pub fn with_block_refiner(mut self, refiner: Box<dyn BlockRefinement>) -> Self {
        self.block_refiners.push(refiner);
        self
    }

    /// Append a comparison-granular refinement stage.
    pub fn with_comparison_refiner(mut self, refiner: Box<dyn BlockRefinement>) -> Self {
        self.comparison_refiners.push(refiner);
        self
    }

    /// Stage names joined in execution order, for reporting.
    pub fn describe(&self) -> String {
        let mut names = vec![self.generator.name()];
        names.extend(self.block_refiners.iter().map(|r| r.name()));
        names.extend(self.comparison_refiners.iter().map(|r| r.name()));
        names.push(self.scorer.name());
        names.push(self.clusterer.name());
        names.join(" -> ")
    }

    /// Run the pipeline over the given collections.
    ///
    /// `d2` is present for bilateral matching and absent for unilateral
    /// deduplication; the oracle's scenario must agree with the input shape.
    /// The oracle is reset before every evaluator invocation.
    pub fn run(
        &self,
        d1: &[EntityId],
        d2: Option<&[EntityId]>,
        oracle: &mut DuplicatePropagation,
        config: &HarnessConfig,
    ) -> Result<PipelineReport> {
        if !(0.0..=1.0).contains(&self.clustering_threshold) {
            return Err(Error::invalid_configuration(
                self.clusterer.name(),
                format!(
                    "clustering threshold {} outside [0, 1]",
                    self.clustering_threshold
                ),
            ));
        }

        let mut timings = Vec::new();
        let mut diagnostics = Vec::new();
        let mut previous_comparisons: Option<u64> = None;

        // Slot 1: candidate generation
        let started = Instant::now();
        let mut candidate_blocks = self
            .generator
            .generate(d1, d2)
            .map_err(|err| Error::stage_failure(self.generator.name(), err))?;
        let elapsed = started.elapsed();
        timings.push(StageTiming {
            stage: self.generator.name().to_string(),
            elapsed,
        });
        if config.verbose {
            oracle.reset_found();
            let metrics = blocks::evaluate(&candidate_blocks, oracle, previous_comparisons);
            blocks::log_statistics(
                &metrics,
                elapsed,
                self.generator.name(),
                &self.generator.configuration(),
            );
            previous_comparisons = Some(metrics.total_comparisons);
            diagnostics.push(metrics);
        }

        // Slots 2 and 3: block-granular then comparison-granular refinement
        for refiner in self.block_refiners.iter().chain(&self.comparison_refiners) {
            let started = Instant::now();
            candidate_blocks = refiner
                .refine(candidate_blocks)
                .map_err(|err| Error::stage_failure(refiner.name(), err))?;
            let elapsed = started.elapsed();
            timings.push(StageTiming {
                stage: refiner.name().to_string(),
                elapsed,
            });
            if config.verbose {
                oracle.reset_found();
                let metrics = blocks::evaluate(&candidate_blocks, oracle, previous_comparisons);
                blocks::log_statistics(&metrics, elapsed, refiner.name(), &refiner.configuration());
                previous_comparisons = Some(metrics.total_comparisons);
                diagnostics.push(metrics);
            }
        }

        // Slot 4: pairwise scoring
        let started = Instant::now();
        let scored_pairs = self
            .scorer
            .score(&candidate_blocks)
            .map_err(|err| Error::stage_failure(self.scorer.name(), err))?;
        let elapsed = started.elapsed();
        timings.push(StageTiming {
            stage: self.scorer.name().to_string(),
            elapsed,
        });
        if config.verbose {
            info!(
                stage = self.scorer.name(),
                configuration = %self.scorer.configuration(),
                elapsed_ms = elapsed.as_millis() as u64,
                scored_pairs = scored_pairs.len(),
                "scoring finished"
            );
        }

        // Slot 5: clustering
        let started = Instant::now();
        let resolved = self
            .clusterer
            .cluster(&scored_pairs, self.clustering_threshold)
            .map_err(|err| Error::stage_failure(self.clusterer.name(), err))?;
        let clustering_elapsed = started.elapsed();
        timings.push(StageTiming {
            stage: self.clusterer.name().to_string(),
            elapsed: clustering_elapsed,
        });

        // The final evaluation is the run's result and always happens;
        // verbosity only controls whether it is also logged.
        oracle.reset_found();
        let metrics = clusters::evaluate(&resolved, oracle, clustering_elapsed);
        if config.verbose {
            clusters::log_statistics(
                &metrics,
                self.clusterer.name(),
                &self.clusterer.configuration(),
            );
        }
        debug!(
            pipeline = %self.describe(),
            f_measure = metrics.f_measure,
            "pipeline run finished"
        );

        Ok(PipelineReport {
            metrics,
            stage_timings: timings,
            block_diagnostics: diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        generate_bilateral, DeduplicateComparisons, ExactIdScoring, ExhaustiveBlocking,
        UniqueMappingClustering,
    };

    fn sample_pipeline(threshold: f64) -> Pipeline {
        Pipeline::new(
            Box::new(ExhaustiveBlocking),
            Box::new(ExactIdScoring),
            Box::new(UniqueMappingClustering),
            threshold,
        )
        .with_comparison_refiner(Box::new(DeduplicateComparisons))
    }

    #[test]
    fn test_describe_lists_stages_in_order() {
        let pipeline = sample_pipeline(0.5);
        assert_eq!(
            pipeline.describe(),
            "exhaustive-blocking -> comparison-dedup -> exact-id -> unique-mapping"
        );
    }

    #[test]
    fn test_out_of_range_threshold_is_rejected_before_any_stage() {
        let dataset = generate_bilateral(4, 2, 7);
        let pipeline = sample_pipeline(1.5);
        let mut oracle = dataset.oracle().unwrap();

        let err = pipeline
            .run(
                &dataset.d1,
                Some(&dataset.d2),
                &mut oracle,
                &HarnessConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
        assert_eq!(err.stage_name(), Some("unique-mapping"));
    }

    #[test]
    fn test_timings_cover_every_stage() {
        let dataset = generate_bilateral(6, 3, 11);
        let pipeline = sample_pipeline(0.5);
        let mut oracle = dataset.oracle().unwrap();

        let report = pipeline
            .run(
                &dataset.d1,
                Some(&dataset.d2),
                &mut oracle,
                &HarnessConfig::default(),
            )
            .unwrap();
        // generation + comparison refiner + scoring + clustering
        assert_eq!(report.stage_timings.len(), 4);
        assert!(report.block_diagnostics.is_empty());
    }

    #[test]
    fn test_verbose_mode_collects_block_diagnostics() {
        let dataset = generate_bilateral(6, 3, 11);
        let pipeline = sample_pipeline(0.5);
        let mut oracle = dataset.oracle().unwrap();

        let report = pipeline
            .run(
                &dataset.d1,
                Some(&dataset.d2),
                &mut oracle,
                &HarnessConfig::verbose(),
            )
            .unwrap();
        // one after generation, one after the comparison refiner
        assert_eq!(report.block_diagnostics.len(), 2);
        // dedup never increases comparison volume
        assert!(
            report.block_diagnostics[1].total_comparisons
                <= report.block_diagnostics[0].total_comparisons
        );
    }
}
