//! # Duplicate Propagation
//!
//! The ground-truth oracle consulted by the performance evaluators.
//!
//! Two scenarios exist. Bilateral ground truth holds cross-collection facts
//! (left id from D1, right id from D2). Unilateral ground truth holds
//! within-collection facts derived from equivalence groups, where a group of
//! size k contributes C(k,2) facts.
//!
//! The fact set is immutable after construction and shared across cloned
//! oracles. The found-state is per-run scratch data: it must be reset before
//! every independent evaluation, otherwise detections from one run leak into
//! the next. Callers that need full isolation (one grid cell per worker)
//! take a [`DuplicatePropagation::fresh`] copy instead of sharing.

use crate::dsu::UnionFind;
use crate::error::{Error, Result};
use crate::model::{DuplicateFact, EntityId};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Shared fact set plus per-run found-state.
#[derive(Debug, Clone)]
struct FactLedger {
    facts: Arc<FxHashSet<DuplicateFact>>,
    found: FxHashSet<DuplicateFact>,
}

impl FactLedger {
    fn new(facts: FxHashSet<DuplicateFact>) -> Self {
        Self {
            facts: Arc::new(facts),
            found: FxHashSet::default(),
        }
    }

    fn contains(&self, fact: &DuplicateFact) -> bool {
        self.facts.contains(fact)
    }

    /// Mark a fact as detected. True only the first time per run.
    fn mark(&mut self, fact: DuplicateFact) -> bool {
        if !self.facts.contains(&fact) {
            return false;
        }
        self.found.insert(fact)
    }

    fn reset(&mut self) {
        self.found.clear();
    }

    fn fresh(&self) -> Self {
        Self {
            facts: Arc::clone(&self.facts),
            found: FxHashSet::default(),
        }
    }
}

/// Bilateral ground truth: facts across two distinct collections.
#[derive(Debug, Clone)]
pub struct BilateralDuplicates {
    ledger: FactLedger,
}

impl BilateralDuplicates {
    /// Build from explicit cross-collection facts, validating every fact
    /// against the declared collections.
    pub fn new(
        facts: impl IntoIterator<Item = DuplicateFact>,
        d1: &[EntityId],
        d2: &[EntityId],
    ) -> Result<Self> {
        let d1_ids: FxHashSet<EntityId> = d1.iter().copied().collect();
        let d2_ids: FxHashSet<EntityId> = d2.iter().copied().collect();

        let mut fact_set = FxHashSet::default();
        for fact in facts {
            if !d1_ids.contains(&fact.left) {
                return Err(Error::invalid_ground_truth(format!(
                    "fact {fact} references {} which is not in the primary collection",
                    fact.left
                )));
            }
            if !d2_ids.contains(&fact.right) {
                return Err(Error::invalid_ground_truth(format!(
                    "fact {fact} references {} which is not in the secondary collection",
                    fact.right
                )));
            }
            fact_set.insert(fact);
        }

        Ok(Self {
            ledger: FactLedger::new(fact_set),
        })
    }
}

/// Unilateral ground truth: facts within a single collection.
#[derive(Debug, Clone)]
pub struct UnilateralDuplicates {
    ledger: FactLedger,
}

impl UnilateralDuplicates {
    /// Build from equivalence groups. A group of size k contributes C(k,2)
    /// facts; groups of size < 2 contribute nothing. An id repeated inside
    /// one group is a configuration error.
    pub fn from_groups(groups: &[Vec<EntityId>]) -> Result<Self> {
        let mut fact_set = FxHashSet::default();
        for group in groups {
            expand_group(group, &mut fact_set)?;
        }
        Ok(Self {
            ledger: FactLedger::new(fact_set),
        })
    }

    /// Build from raw duplicate pairs, closing them transitively: the pairs
    /// (a,b) and (b,c) yield the group {a,b,c} and therefore three facts.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (EntityId, EntityId)>) -> Result<Self> {
        let mut uf = UnionFind::new();
        for (a, b) in pairs {
            if a == b {
                return Err(Error::invalid_ground_truth(format!(
                    "pair ({a}, {b}) relates an entity to itself"
                )));
            }
            uf.union(a, b);
        }

        let mut fact_set = FxHashSet::default();
        for group in uf.components() {
            expand_group(&group, &mut fact_set)?;
        }
        Ok(Self {
            ledger: FactLedger::new(fact_set),
        })
    }
}

fn expand_group(group: &[EntityId], fact_set: &mut FxHashSet<DuplicateFact>) -> Result<()> {
    let mut seen = FxHashSet::default();
    for &id in group {
        if !seen.insert(id) {
            return Err(Error::invalid_ground_truth(format!(
                "{id} appears twice in an equivalence group"
            )));
        }
    }
    if group.len() < 2 {
        return Ok(());
    }
    for (i, &a) in group.iter().enumerate() {
        for &b in &group[i + 1..] {
            fact_set.insert(DuplicateFact::unordered(a, b));
        }
    }
    Ok(())
}

/// Ground-truth oracle, polymorphic over the deduplication scenario.
#[derive(Debug, Clone)]
pub enum DuplicatePropagation {
    Bilateral(BilateralDuplicates),
    Unilateral(UnilateralDuplicates),
}

impl DuplicatePropagation {
    /// Bilateral oracle from explicit cross-collection facts.
    pub fn bilateral(
        facts: impl IntoIterator<Item = DuplicateFact>,
        d1: &[EntityId],
        d2: &[EntityId],
    ) -> Result<Self> {
        Ok(Self::Bilateral(BilateralDuplicates::new(facts, d1, d2)?))
    }

    /// Unilateral oracle from equivalence groups.
    pub fn unilateral_from_groups(groups: &[Vec<EntityId>]) -> Result<Self> {
        Ok(Self::Unilateral(UnilateralDuplicates::from_groups(groups)?))
    }

    /// Unilateral oracle from raw pairs, closed transitively.
    pub fn unilateral_from_pairs(
        pairs: impl IntoIterator<Item = (EntityId, EntityId)>,
    ) -> Result<Self> {
        Ok(Self::Unilateral(UnilateralDuplicates::from_pairs(pairs)?))
    }

    pub fn is_bilateral(&self) -> bool {
        matches!(self, Self::Bilateral(_))
    }

    /// Normalize an evaluated pair into the fact shape of this scenario.
    ///
    /// Bilateral pairs arrive as (D1 id, D2 id) and keep their order;
    /// unilateral pairs are canonicalized.
    fn fact_for(&self, a: EntityId, b: EntityId) -> DuplicateFact {
        match self {
            Self::Bilateral(_) => DuplicateFact::cross(a, b),
            Self::Unilateral(_) => DuplicateFact::unordered(a, b),
        }
    }

    fn ledger(&self) -> &FactLedger {
        match self {
            Self::Bilateral(inner) => &inner.ledger,
            Self::Unilateral(inner) => &inner.ledger,
        }
    }

    fn ledger_mut(&mut self) -> &mut FactLedger {
        match self {
            Self::Bilateral(inner) => &mut inner.ledger,
            Self::Unilateral(inner) => &mut inner.ledger,
        }
    }

    /// Check whether (a, b) is a ground-truth duplicate.
    pub fn is_duplicate(&self, a: EntityId, b: EntityId) -> bool {
        let fact = self.fact_for(a, b);
        self.ledger().contains(&fact)
    }

    /// Mark (a, b) as detected in the current run.
    ///
    /// Returns true only the first time a given fact is marked since the
    /// last reset, so a duplicate spanning several overlapping blocks or
    /// clusters is counted exactly once.
    pub fn mark_found(&mut self, a: EntityId, b: EntityId) -> bool {
        let fact = self.fact_for(a, b);
        self.ledger_mut().mark(fact)
    }

    /// Clear the per-run found-state. Must be invoked before every
    /// independent evaluation.
    pub fn reset_found(&mut self) {
        self.ledger_mut().reset();
    }

    /// Total number of ground-truth facts. Constant after construction.
    pub fn total_duplicates(&self) -> usize {
        self.ledger().facts.len()
    }

    /// Number of facts marked found since the last reset.
    pub fn found_count(&self) -> usize {
        self.ledger().found.len()
    }

    /// A new oracle over the same shared facts with empty found-state.
    pub fn fresh(&self) -> Self {
        match self {
            Self::Bilateral(inner) => Self::Bilateral(BilateralDuplicates {
                ledger: inner.ledger.fresh(),
            }),
            Self::Unilateral(inner) => Self::Unilateral(UnilateralDuplicates {
                ledger: inner.ledger.fresh(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u32]) -> Vec<EntityId> {
        values.iter().copied().map(EntityId).collect()
    }

    #[test]
    fn test_group_expansion_counts() {
        // C(3,2) + C(2,2) + 0 = 3 + 1 + 0
        let groups = vec![ids(&[1, 2, 3]), ids(&[10, 11]), ids(&[20])];
        let oracle = DuplicatePropagation::unilateral_from_groups(&groups).unwrap();
        assert_eq!(oracle.total_duplicates(), 4);
    }

    #[test]
    fn test_singleton_group_contributes_nothing() {
        let oracle = DuplicatePropagation::unilateral_from_groups(&[ids(&[7])]).unwrap();
        assert_eq!(oracle.total_duplicates(), 0);
    }

    #[test]
    fn test_repeated_id_in_group_is_rejected() {
        let err = DuplicatePropagation::unilateral_from_groups(&[ids(&[1, 2, 1])]).unwrap_err();
        assert!(matches!(err, Error::InvalidGroundTruth(_)));
    }

    #[test]
    fn test_pairs_are_closed_transitively() {
        let oracle = DuplicatePropagation::unilateral_from_pairs([
            (EntityId(1), EntityId(2)),
            (EntityId(2), EntityId(3)),
        ])
        .unwrap();
        // {1,2,3} closes to three facts
        assert_eq!(oracle.total_duplicates(), 3);
        assert!(oracle.is_duplicate(EntityId(1), EntityId(3)));
    }

    #[test]
    fn test_self_pair_is_rejected() {
        let err =
            DuplicatePropagation::unilateral_from_pairs([(EntityId(4), EntityId(4))]).unwrap_err();
        assert!(matches!(err, Error::InvalidGroundTruth(_)));
    }

    #[test]
    fn test_unilateral_pairs_are_symmetric() {
        let oracle =
            DuplicatePropagation::unilateral_from_groups(&[ids(&[1, 2])]).unwrap();
        assert!(oracle.is_duplicate(EntityId(1), EntityId(2)));
        assert!(oracle.is_duplicate(EntityId(2), EntityId(1)));
    }

    #[test]
    fn test_bilateral_validates_collections() {
        let d1 = ids(&[1, 2]);
        let d2 = ids(&[10, 11]);
        let ok = DuplicatePropagation::bilateral(
            [DuplicateFact::cross(EntityId(1), EntityId(10))],
            &d1,
            &d2,
        );
        assert!(ok.is_ok());

        let err = DuplicatePropagation::bilateral(
            [DuplicateFact::cross(EntityId(1), EntityId(99))],
            &d1,
            &d2,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidGroundTruth(_)));
    }

    #[test]
    fn test_bilateral_sides_are_positional() {
        // The same numeric id on both sides stays distinguishable.
        let d1 = ids(&[1]);
        let d2 = ids(&[1, 2]);
        let oracle = DuplicatePropagation::bilateral(
            [DuplicateFact::cross(EntityId(1), EntityId(2))],
            &d1,
            &d2,
        )
        .unwrap();
        assert!(oracle.is_duplicate(EntityId(1), EntityId(2)));
        assert!(!oracle.is_duplicate(EntityId(2), EntityId(1)));
    }

    #[test]
    fn test_mark_found_is_exactly_once_until_reset() {
        let mut oracle =
            DuplicatePropagation::unilateral_from_groups(&[ids(&[1, 2])]).unwrap();
        assert!(oracle.mark_found(EntityId(1), EntityId(2)));
        assert!(!oracle.mark_found(EntityId(1), EntityId(2)));
        assert!(!oracle.mark_found(EntityId(2), EntityId(1)));
        assert_eq!(oracle.found_count(), 1);

        oracle.reset_found();
        assert_eq!(oracle.found_count(), 0);
        assert!(oracle.mark_found(EntityId(1), EntityId(2)));
    }

    #[test]
    fn test_mark_found_on_non_fact_is_false() {
        let mut oracle =
            DuplicatePropagation::unilateral_from_groups(&[ids(&[1, 2])]).unwrap();
        assert!(!oracle.mark_found(EntityId(1), EntityId(3)));
        assert_eq!(oracle.found_count(), 0);
    }

    #[test]
    fn test_fresh_shares_facts_but_not_found_state() {
        let mut oracle =
            DuplicatePropagation::unilateral_from_groups(&[ids(&[1, 2, 3])]).unwrap();
        oracle.mark_found(EntityId(1), EntityId(2));

        let fresh = oracle.fresh();
        assert_eq!(fresh.total_duplicates(), oracle.total_duplicates());
        assert_eq!(fresh.found_count(), 0);
        assert_eq!(oracle.found_count(), 1);
    }

    #[test]
    fn test_total_duplicates_is_stable_across_runs() {
        let mut oracle =
            DuplicatePropagation::unilateral_from_groups(&[ids(&[1, 2, 3])]).unwrap();
        let total = oracle.total_duplicates();
        oracle.mark_found(EntityId(1), EntityId(2));
        oracle.mark_found(EntityId(2), EntityId(3));
        assert_eq!(oracle.total_duplicates(), total);
        oracle.reset_found();
        assert_eq!(oracle.total_duplicates(), total);
    }
}
