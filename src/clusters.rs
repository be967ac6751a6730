//! # Clustering Performance
//!
//! Derives precision/recall/F-measure from resolved entity clusters against
//! the ground-truth oracle.
//!
//! Each cluster asserts all of its internal pairs as duplicates (cross-side
//! pairs for bilateral clusters, all combinations for unilateral ones). True
//! positives go through the oracle's mark-found discipline so a fact claimed
//! by two distinct clusters is still counted once.

use crate::model::{MetricResult, ResolvedCluster};
use crate::propagation::DuplicatePropagation;
use std::time::Duration;
use tracing::info;

/// Evaluate resolved clusters against the oracle.
///
/// The oracle's found-state is reset on entry, independently of any blocks
/// evaluation that ran against the same oracle earlier in the run. `elapsed`
/// is the wall-clock span of the clustering stage, measured by the caller.
pub fn evaluate(
    clusters: &[ResolvedCluster],
    oracle: &mut DuplicatePropagation,
    elapsed: Duration,
) -> MetricResult {
    oracle.reset_found();

    let mut predicted_pairs = 0u64;
    let mut true_positives = 0usize;

    for cluster in clusters {
        for pair in cluster.pairs() {
            predicted_pairs += 1;
            if oracle.is_duplicate(pair.left, pair.right)
                && oracle.mark_found(pair.left, pair.right)
            {
                true_positives += 1;
            }
        }
    }

    let precision = if predicted_pairs > 0 {
        true_positives as f64 / predicted_pairs as f64
    } else {
        0.0
    };
    let recall = if oracle.total_duplicates() > 0 {
        true_positives as f64 / oracle.total_duplicates() as f64
    } else {
        0.0
    };

    MetricResult::new(precision, recall, elapsed)
}

/// Emit the metric set for a clustering stage through tracing.
pub fn log_statistics(metrics: &MetricResult, name: &str, configuration: &str) {
    info!(
        stage = name,
        configuration,
        elapsed_ms = metrics.elapsed.as_millis() as u64,
        precision = metrics.precision,
        recall = metrics.recall,
        f_measure = metrics.f_measure,
        "clustering statistics"
    );
}
