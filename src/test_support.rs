//! Synthetic datasets and naive reference strategies.
//!
//! The harness treats stage strategies as external black boxes; the
//! implementations here exist so tests, benches, and the demo can exercise a
//! full pipeline with known ground truth. They are deliberately simple and
//! deterministic, not useful matchers.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use crate::dsu::UnionFind;
use crate::error::Result;
use crate::model::{
    BlockId, CandidateBlock, ClusterId, DuplicateFact, EntityId, Membership, ResolvedCluster,
    ScoredPair,
};
use crate::propagation::DuplicatePropagation;
use crate::stage::{BlockRefinement, CandidateGeneration, Clustering, PairScoring};

/// A bilateral test corpus: two collections and their cross-collection facts.
///
/// Duplicate partners share the same numeric id across collections, so
/// [`ExactIdScoring`] recovers exactly the true matches; every other D2
/// record gets an id offset past the D1 range.
#[derive(Debug, Clone)]
pub struct BilateralDataset {
    pub d1: Vec<EntityId>,
    pub d2: Vec<EntityId>,
    pub facts: Vec<DuplicateFact>,
}

impl BilateralDataset {
    pub fn oracle(&self) -> Result<DuplicatePropagation> {
        DuplicatePropagation::bilateral(self.facts.iter().copied(), &self.d1, &self.d2)
    }
}

/// Generate a bilateral corpus of `count` records per collection with
/// `duplicates` matched pairs chosen by the seeded rng.
pub fn generate_bilateral(count: u32, duplicates: usize, seed: u64) -> BilateralDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let duplicates = duplicates.min(count as usize);

    let mut matched = FxHashSet::default();
    while matched.len() < duplicates {
        matched.insert(rng.random_range(0..count));
    }

    let d1: Vec<EntityId> = (0..count).map(EntityId).collect();
    let mut d2 = Vec::with_capacity(count as usize);
    let mut facts = Vec::with_capacity(duplicates);
    for i in 0..count {
        if matched.contains(&i) {
            d2.push(EntityId(i));
            facts.push(DuplicateFact::cross(EntityId(i), EntityId(i)));
        } else {
            d2.push(EntityId(count + i));
        }
    }

    BilateralDataset { d1, d2, facts }
}

/// A unilateral test corpus: one collection and its equivalence groups.
#[derive(Debug, Clone)]
pub struct UnilateralDataset {
    pub ids: Vec<EntityId>,
    pub groups: Vec<Vec<EntityId>>,
}

impl UnilateralDataset {
    pub fn oracle(&self) -> Result<DuplicatePropagation> {
        DuplicatePropagation::unilateral_from_groups(&self.groups)
    }
}

/// Generate a unilateral corpus of `groups` equivalence groups of
/// `group_size` members each plus `singletons` unmatched records. The
/// collection order is shuffled by the seeded rng.
pub fn generate_unilateral(
    groups: u32,
    group_size: u32,
    singletons: u32,
    seed: u64,
) -> UnilateralDataset {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut ids = Vec::new();
    let mut group_list = Vec::with_capacity(groups as usize);
    let mut next_id = 0u32;
    for _ in 0..groups {
        let members: Vec<EntityId> = (0..group_size)
            .map(|_| {
                let id = EntityId(next_id);
                next_id += 1;
                id
            })
            .collect();
        ids.extend_from_slice(&members);
        group_list.push(members);
    }
    for _ in 0..singletons {
        ids.push(EntityId(next_id));
        next_id += 1;
    }
    ids.shuffle(&mut rng);

    UnilateralDataset {
        ids,
        groups: group_list,
    }
}

// ============================================================================
// Reference stage strategies
// ============================================================================

/// One block over everything: the full cross-product baseline.
pub struct ExhaustiveBlocking;

impl CandidateGeneration for ExhaustiveBlocking {
    fn name(&self) -> &str {
        "exhaustive-blocking"
    }

    fn configuration(&self) -> String {
        "no parameters".to_string()
    }

    fn generate(
        &self,
        d1: &[EntityId],
        d2: Option<&[EntityId]>,
    ) -> anyhow::Result<Vec<CandidateBlock>> {
        let members = match d2 {
            Some(d2) => Membership::bilateral(d1.to_vec(), d2.to_vec()),
            None => Membership::unilateral(d1.to_vec()),
        };
        Ok(vec![CandidateBlock::new(BlockId(0), members)])
    }
}

/// Sorted-neighborhood style blocking: sort each collection by id and emit
/// one block per overlapping window of the given size. Consecutive windows
/// overlap, so the same comparison appears in several blocks.
pub struct SortedWindowBlocking {
    pub window: u32,
}

impl CandidateGeneration for SortedWindowBlocking {
    fn name(&self) -> &str {
        "sorted-window"
    }

    fn configuration(&self) -> String {
        format!("window={}", self.window)
    }

    fn generate(
        &self,
        d1: &[EntityId],
        d2: Option<&[EntityId]>,
    ) -> anyhow::Result<Vec<CandidateBlock>> {
        anyhow::ensure!(self.window >= 2, "window size {} below 2", self.window);
        let window = self.window as usize;

        let mut left = d1.to_vec();
        left.sort_unstable();

        let mut blocks = Vec::new();
        match d2 {
            Some(d2) => {
                let mut right = d2.to_vec();
                right.sort_unstable();
                let span = left.len().max(right.len());
                for start in 0..span {
                    let l = &left[start.min(left.len())..(start + window).min(left.len())];
                    let r = &right[start.min(right.len())..(start + window).min(right.len())];
                    if l.is_empty() || r.is_empty() {
                        continue;
                    }
                    blocks.push(CandidateBlock::new(
                        BlockId(blocks.len() as u32),
                        Membership::bilateral(l.to_vec(), r.to_vec()),
                    ));
                }
            }
            None => {
                for start in 0..left.len() {
                    let members = &left[start..(start + window).min(left.len())];
                    if members.len() < 2 {
                        continue;
                    }
                    blocks.push(CandidateBlock::new(
                        BlockId(blocks.len() as u32),
                        Membership::unilateral(members.to_vec()),
                    ));
                }
            }
        }

        Ok(blocks)
    }
}

/// Drops oversized blocks: a block survives if its comparison count is at
/// most `ratio` times the largest block's count.
pub struct CardinalityFilter {
    ratio: f64,
}

impl CardinalityFilter {
    pub fn new(ratio: f64) -> anyhow::Result<Self> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&ratio),
            "filter ratio {ratio} outside [0, 1]"
        );
        Ok(Self { ratio })
    }
}

impl BlockRefinement for CardinalityFilter {
    fn name(&self) -> &str {
        "cardinality-filter"
    }

    fn configuration(&self) -> String {
        format!("ratio={}", self.ratio)
    }

    fn refine(&self, blocks: Vec<CandidateBlock>) -> anyhow::Result<Vec<CandidateBlock>> {
        let Some(largest) = blocks.iter().map(|b| b.comparison_count()).max() else {
            return Ok(blocks);
        };
        let cap = (largest as f64 * self.ratio).ceil() as u64;
        Ok(blocks
            .into_iter()
            .filter(|block| block.comparison_count() <= cap)
            .collect())
    }
}

/// Comparison-granular cleaning: every distinct comparison survives exactly
/// once, as its own two-member block. Repeats implied by overlapping blocks
/// are discarded.
pub struct DeduplicateComparisons;

impl BlockRefinement for DeduplicateComparisons {
    fn name(&self) -> &str {
        "comparison-dedup"
    }

    fn configuration(&self) -> String {
        "no parameters".to_string()
    }

    fn refine(&self, blocks: Vec<CandidateBlock>) -> anyhow::Result<Vec<CandidateBlock>> {
        let mut seen: FxHashSet<(EntityId, EntityId)> = FxHashSet::default();
        let mut out = Vec::new();
        for block in &blocks {
            let bilateral = matches!(block.members, Membership::Bilateral { .. });
            for pair in block.comparisons() {
                // Bilateral keys are positional; unilateral keys unordered
                let key = if bilateral || pair.left <= pair.right {
                    (pair.left, pair.right)
                } else {
                    (pair.right, pair.left)
                };
                if !seen.insert(key) {
                    continue;
                }
                let members = if bilateral {
                    Membership::bilateral(vec![pair.left], vec![pair.right])
                } else {
                    Membership::unilateral(vec![pair.left, pair.right])
                };
                out.push(CandidateBlock::new(BlockId(out.len() as u32), members));
            }
        }
        Ok(out)
    }
}

/// Scores 1.0 when both sides carry the same numeric id, 0.0 otherwise.
/// Pairs with the synthetic datasets above, where duplicate partners share
/// their id.
pub struct ExactIdScoring;

impl PairScoring for ExactIdScoring {
    fn name(&self) -> &str {
        "exact-id"
    }

    fn configuration(&self) -> String {
        "metric=exact-id".to_string()
    }

    fn score(&self, blocks: &[CandidateBlock]) -> anyhow::Result<Vec<ScoredPair>> {
        let metric: Arc<str> = Arc::from("exact-id");
        let mut pairs = Vec::new();
        for block in blocks {
            for pair in block.comparisons() {
                let score = if pair.left.0 == pair.right.0 { 1.0 } else { 0.0 };
                pairs.push(ScoredPair::new(pair, score, Arc::clone(&metric)));
            }
        }
        Ok(pairs)
    }
}

/// Scores from an explicit lookup table, for tests that need full control
/// over the similarity landscape.
pub struct TableScoring {
    scores: FxHashMap<(EntityId, EntityId), f64>,
    default: f64,
}

impl TableScoring {
    pub fn new(default: f64) -> Self {
        Self {
            scores: FxHashMap::default(),
            default,
        }
    }

    pub fn with_score(mut self, left: EntityId, right: EntityId, score: f64) -> Self {
        self.scores.insert((left, right), score);
        self
    }
}

impl PairScoring for TableScoring {
    fn name(&self) -> &str {
        "score-table"
    }

    fn configuration(&self) -> String {
        format!("entries={} default={}", self.scores.len(), self.default)
    }

    fn score(&self, blocks: &[CandidateBlock]) -> anyhow::Result<Vec<ScoredPair>> {
        let metric: Arc<str> = Arc::from("table");
        let mut pairs = Vec::new();
        for block in blocks {
            for pair in block.comparisons() {
                let score = self
                    .scores
                    .get(&(pair.left, pair.right))
                    .or_else(|| self.scores.get(&(pair.right, pair.left)))
                    .copied()
                    .unwrap_or(self.default);
                pairs.push(ScoredPair::new(pair, score, Arc::clone(&metric)));
            }
        }
        Ok(pairs)
    }
}

/// Bilateral clustering: rank pairs by score and greedily accept each pair
/// whose endpoints are both unused, one two-member cluster per accepted
/// pair. Entities left unmatched form no cluster.
pub struct UniqueMappingClustering;

impl Clustering for UniqueMappingClustering {
    fn name(&self) -> &str {
        "unique-mapping"
    }

    fn configuration(&self) -> String {
        "greedy one-to-one assignment".to_string()
    }

    fn cluster(
        &self,
        pairs: &[ScoredPair],
        threshold: f64,
    ) -> anyhow::Result<Vec<ResolvedCluster>> {
        let mut ranked: Vec<&ScoredPair> = pairs.iter().filter(|p| p.score >= threshold).collect();
        // Ties broken by pair ids so the assignment is deterministic
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (a.pair.left, a.pair.right).cmp(&(b.pair.left, b.pair.right)))
        });

        let mut used_left = FxHashSet::default();
        let mut used_right = FxHashSet::default();
        let mut clusters = Vec::new();
        for scored in ranked {
            if used_left.contains(&scored.pair.left) || used_right.contains(&scored.pair.right) {
                continue;
            }
            used_left.insert(scored.pair.left);
            used_right.insert(scored.pair.right);
            clusters.push(ResolvedCluster::new(
                ClusterId(clusters.len() as u32),
                Membership::bilateral(vec![scored.pair.left], vec![scored.pair.right]),
            ));
        }
        Ok(clusters)
    }
}

/// Unilateral clustering: connected components over pairs at or above the
/// threshold. Entities that appeared in the scored pairs but matched nothing
/// come out as singleton clusters.
pub struct ComponentClustering;

impl Clustering for ComponentClustering {
    fn name(&self) -> &str {
        "component-clustering"
    }

    fn configuration(&self) -> String {
        "connected components".to_string()
    }

    fn cluster(
        &self,
        pairs: &[ScoredPair],
        threshold: f64,
    ) -> anyhow::Result<Vec<ResolvedCluster>> {
        let mut uf = UnionFind::new();
        for scored in pairs {
            if scored.score >= threshold {
                uf.union(scored.pair.left, scored.pair.right);
            } else {
                uf.insert(scored.pair.left);
                uf.insert(scored.pair.right);
            }
        }

        Ok(uf
            .components()
            .into_iter()
            .enumerate()
            .map(|(i, members)| {
                ResolvedCluster::new(ClusterId(i as u32), Membership::unilateral(members))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bilateral_dataset_shape() {
        let dataset = generate_bilateral(10, 4, 42);
        assert_eq!(dataset.d1.len(), 10);
        assert_eq!(dataset.d2.len(), 10);
        assert_eq!(dataset.facts.len(), 4);
        let oracle = dataset.oracle().unwrap();
        assert_eq!(oracle.total_duplicates(), 4);
    }

    #[test]
    fn test_bilateral_dataset_is_reproducible() {
        let a = generate_bilateral(20, 8, 7);
        let b = generate_bilateral(20, 8, 7);
        assert_eq!(a.facts, b.facts);
        assert_eq!(a.d2, b.d2);
    }

    #[test]
    fn test_unilateral_dataset_shape() {
        let dataset = generate_unilateral(3, 3, 2, 42);
        assert_eq!(dataset.ids.len(), 11);
        let oracle = dataset.oracle().unwrap();
        // 3 groups of 3: 3 * C(3,2)
        assert_eq!(oracle.total_duplicates(), 9);
    }

    #[test]
    fn test_sorted_window_blocks_overlap() {
        let generator = SortedWindowBlocking { window: 3 };
        let ids: Vec<EntityId> = (0..5).map(EntityId).collect();
        let blocks = generator.generate(&ids, None).unwrap();
        // windows: [0,1,2] [1,2,3] [2,3,4] [3,4]
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0].members, Membership::unilateral(vec![
            EntityId(0), EntityId(1), EntityId(2)
        ]));
    }

    #[test]
    fn test_window_below_two_is_rejected() {
        let generator = SortedWindowBlocking { window: 1 };
        assert!(generator.generate(&[EntityId(0)], None).is_err());
    }

    #[test]
    fn test_cardinality_filter_drops_largest_blocks() {
        let filter = CardinalityFilter::new(0.5).unwrap();
        let blocks = vec![
            CandidateBlock::new(
                BlockId(0),
                Membership::unilateral((0..10).map(EntityId).collect()),
            ),
            CandidateBlock::new(
                BlockId(1),
                Membership::unilateral((10..13).map(EntityId).collect()),
            ),
        ];
        let refined = filter.refine(blocks).unwrap();
        assert_eq!(refined.len(), 1);
        assert_eq!(refined[0].id, BlockId(1));
    }

    #[test]
    fn test_cardinality_filter_validates_ratio() {
        assert!(CardinalityFilter::new(1.5).is_err());
        assert!(CardinalityFilter::new(-0.1).is_err());
    }

    #[test]
    fn test_dedup_keeps_each_comparison_once() {
        let ids: Vec<EntityId> = (0..4).map(EntityId).collect();
        let generator = SortedWindowBlocking { window: 3 };
        let blocks = generator.generate(&ids, None).unwrap();
        let total_before: u64 = blocks.iter().map(|b| b.comparison_count()).sum();

        let refined = DeduplicateComparisons.refine(blocks).unwrap();
        let total_after: u64 = refined.iter().map(|b| b.comparison_count()).sum();
        assert!(total_after < total_before);
        // every pair within window reach of each other, each exactly once
        assert_eq!(total_after, 7);
    }

    #[test]
    fn test_unique_mapping_prefers_higher_scores() {
        let scorer = TableScoring::new(0.0)
            .with_score(EntityId(1), EntityId(10), 0.9)
            .with_score(EntityId(1), EntityId(11), 0.8)
            .with_score(EntityId(2), EntityId(11), 0.7);
        let block = CandidateBlock::new(
            BlockId(0),
            Membership::bilateral(
                vec![EntityId(1), EntityId(2)],
                vec![EntityId(10), EntityId(11)],
            ),
        );
        let pairs = scorer.score(&[block]).unwrap();
        let clusters = UniqueMappingClustering.cluster(&pairs, 0.5).unwrap();

        assert_eq!(clusters.len(), 2);
        assert_eq!(
            clusters[0].members,
            Membership::bilateral(vec![EntityId(1)], vec![EntityId(10)])
        );
        assert_eq!(
            clusters[1].members,
            Membership::bilateral(vec![EntityId(2)], vec![EntityId(11)])
        );
    }

    #[test]
    fn test_component_clustering_merges_transitively() {
        let metric: Arc<str> = Arc::from("table");
        let pairs = vec![
            ScoredPair::new(
                crate::model::ComparisonPair::new(EntityId(1), EntityId(2)),
                0.9,
                Arc::clone(&metric),
            ),
            ScoredPair::new(
                crate::model::ComparisonPair::new(EntityId(2), EntityId(3)),
                0.8,
                Arc::clone(&metric),
            ),
            ScoredPair::new(
                crate::model::ComparisonPair::new(EntityId(3), EntityId(4)),
                0.1,
                metric,
            ),
        ];
        let clusters = ComponentClustering.cluster(&pairs, 0.5).unwrap();
        // {1,2,3} plus singleton {4}
        assert_eq!(clusters.len(), 2);
        assert_eq!(
            clusters[0].members,
            Membership::unilateral(vec![EntityId(1), EntityId(2), EntityId(3)])
        );
    }
}
