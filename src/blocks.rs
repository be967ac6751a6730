//! # Blocking Performance
//!
//! Derives comparison-volume and recall/precision metrics from a candidate
//! block list against the ground-truth oracle.
//!
//! Blocks generate only the comparisons their own membership implies; two
//! entities placed in different blocks are simply never compared. Overlapping
//! blocks may imply the same ground-truth fact more than once — detection is
//! counted through the oracle's mark-found discipline so each fact counts
//! exactly once per evaluation.

use crate::model::CandidateBlock;
use crate::propagation::DuplicatePropagation;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Metrics derived from one block list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlocksMetrics {
    /// Comparisons implied by all blocks together.
    pub total_comparisons: u64,
    /// Ground-truth facts covered by at least one block, counted once each.
    pub detected_duplicates: usize,
    /// Pair completeness: detected / total ground-truth facts.
    pub recall: f64,
    /// Pair quality: detected / total comparisons.
    pub precision: f64,
    /// Comparison volume saved versus a previous stage, 0 when no
    /// predecessor count was supplied.
    pub reduction_ratio: f64,
}

/// Evaluate a block list against the oracle.
///
/// The oracle's found-state is reset on entry, so the evaluation is
/// independent of whatever ran before it. `previous_comparisons` is the
/// comparison count of the preceding stage when chaining refinements.
pub fn evaluate(
    blocks: &[CandidateBlock],
    oracle: &mut DuplicatePropagation,
    previous_comparisons: Option<u64>,
) -> BlocksMetrics {
    oracle.reset_found();

    let mut total_comparisons = 0u64;
    let mut detected_duplicates = 0usize;

    for block in blocks {
        for pair in block.comparisons() {
            total_comparisons += 1;
            if oracle.is_duplicate(pair.left, pair.right)
                && oracle.mark_found(pair.left, pair.right)
            {
                detected_duplicates += 1;
            }
        }
    }

    let recall = ratio(detected_duplicates as f64, oracle.total_duplicates() as f64);
    let precision = ratio(detected_duplicates as f64, total_comparisons as f64);
    let reduction_ratio = match previous_comparisons {
        Some(previous) if previous > 0 => 1.0 - total_comparisons as f64 / previous as f64,
        _ => 0.0,
    };

    BlocksMetrics {
        total_comparisons,
        detected_duplicates,
        recall,
        precision,
        reduction_ratio,
    }
}

/// Emit the metric set for one blocking stage through tracing.
pub fn log_statistics(metrics: &BlocksMetrics, elapsed: Duration, name: &str, configuration: &str) {
    info!(
        stage = name,
        configuration,
        elapsed_ms = elapsed.as_millis() as u64,
        total_comparisons = metrics.total_comparisons,
        detected_duplicates = metrics.detected_duplicates,
        recall = metrics.recall,
        precision = metrics.precision,
        reduction_ratio = metrics.reduction_ratio,
        "blocking statistics"
    );
}

// 0/0 reports as 0, never NaN
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockId, DuplicateFact, EntityId, Membership};

    fn ids(values: &[u32]) -> Vec<EntityId> {
        values.iter().copied().map(EntityId).collect()
    }

    fn block(id: u32, members: Membership) -> CandidateBlock {
        CandidateBlock::new(BlockId(id), members)
    }

    #[test]
    fn test_bilateral_single_block() {
        // D1 = {a1, a2}, D2 = {b1, b2}, one fact (a1, b1), one block with
        // all four ids: 4 comparisons, 1 detected, recall 1.0, precision 0.25
        let d1 = ids(&[1, 2]);
        let d2 = ids(&[11, 12]);
        let mut oracle = DuplicatePropagation::bilateral(
            [DuplicateFact::cross(EntityId(1), EntityId(11))],
            &d1,
            &d2,
        )
        .unwrap();

        let blocks = vec![block(0, Membership::bilateral(d1.clone(), d2.clone()))];
        let metrics = evaluate(&blocks, &mut oracle, None);

        assert_eq!(metrics.total_comparisons, 4);
        assert_eq!(metrics.detected_duplicates, 1);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.precision, 0.25);
        assert_eq!(metrics.reduction_ratio, 0.0);
    }

    #[test]
    fn test_overlapping_blocks_count_facts_once() {
        let mut oracle =
            DuplicatePropagation::unilateral_from_groups(&[ids(&[1, 2])]).unwrap();

        // Both blocks imply the (1,2) fact
        let blocks = vec![
            block(0, Membership::unilateral(ids(&[1, 2, 3]))),
            block(1, Membership::unilateral(ids(&[1, 2, 4]))),
        ];
        let metrics = evaluate(&blocks, &mut oracle, None);

        assert_eq!(metrics.total_comparisons, 6);
        assert_eq!(metrics.detected_duplicates, 1);
        assert!(metrics.detected_duplicates <= oracle.total_duplicates());
    }

    #[test]
    fn test_empty_block_list_is_all_zero() {
        let mut oracle =
            DuplicatePropagation::unilateral_from_groups(&[ids(&[1, 2])]).unwrap();
        let metrics = evaluate(&[], &mut oracle, None);

        assert_eq!(metrics.total_comparisons, 0);
        assert_eq!(metrics.detected_duplicates, 0);
        assert_eq!(metrics.recall, 0.0);
        assert_eq!(metrics.precision, 0.0);
    }

    #[test]
    fn test_zero_ground_truth_reports_zero_recall() {
        let mut oracle = DuplicatePropagation::unilateral_from_groups(&[]).unwrap();
        let blocks = vec![block(0, Membership::unilateral(ids(&[1, 2, 3])))];
        let metrics = evaluate(&blocks, &mut oracle, None);

        assert_eq!(metrics.total_comparisons, 3);
        assert_eq!(metrics.recall, 0.0);
        assert!(!metrics.recall.is_nan());
    }

    #[test]
    fn test_reduction_ratio_against_previous_stage() {
        let mut oracle = DuplicatePropagation::unilateral_from_groups(&[]).unwrap();
        let blocks = vec![block(0, Membership::unilateral(ids(&[1, 2, 3, 4, 5])))];
        // 10 comparisons after 40
        let metrics = evaluate(&blocks, &mut oracle, Some(40));
        assert_eq!(metrics.reduction_ratio, 0.75);
    }

    #[test]
    fn test_evaluation_resets_found_state() {
        let mut oracle =
            DuplicatePropagation::unilateral_from_groups(&[ids(&[1, 2])]).unwrap();
        let blocks = vec![block(0, Membership::unilateral(ids(&[1, 2])))];

        let first = evaluate(&blocks, &mut oracle, None);
        let second = evaluate(&blocks, &mut oracle, None);
        assert_eq!(first, second);
        assert_eq!(second.detected_duplicates, 1);
    }
}
