//! # Data Model
//!
//! Core data structures for pipeline evaluation: entity identifiers,
//! ground-truth duplicate facts, candidate blocks, resolved clusters, and
//! derived metric results.
//!
//! Collections are positional: D1 is the primary collection and D2 the
//! secondary one in bilateral scenarios. An identifier's collection is given
//! by which side of a [`Membership`] it appears on, never by the identifier
//! itself — the same numeric id may exist in both collections.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Compact identifier for entity records, unique within its source collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Compact identifier for candidate blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Compact identifier for resolved clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub u32);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// A ground-truth assertion that two records refer to the same entity.
///
/// Bilateral facts keep collection order: `left` belongs to D1 and `right`
/// to D2. Unilateral facts are canonicalized to `(min, max)` so that the
/// unordered pairs `(a,b)` and `(b,a)` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DuplicateFact {
    pub left: EntityId,
    pub right: EntityId,
}

impl DuplicateFact {
    /// Cross-collection fact: `d1` from the primary, `d2` from the secondary
    /// collection. Order is preserved.
    pub fn cross(d1: EntityId, d2: EntityId) -> Self {
        Self {
            left: d1,
            right: d2,
        }
    }

    /// Within-collection fact, canonicalized so member order is irrelevant.
    pub fn unordered(a: EntityId, b: EntityId) -> Self {
        if a <= b {
            Self { left: a, right: b }
        } else {
            Self { left: b, right: a }
        }
    }
}

impl fmt::Display for DuplicateFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.left, self.right)
    }
}

/// A candidate comparison implied by a block's or cluster's membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComparisonPair {
    pub left: EntityId,
    pub right: EntityId,
}

impl ComparisonPair {
    pub fn new(left: EntityId, right: EntityId) -> Self {
        Self { left, right }
    }
}

impl fmt::Display for ComparisonPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.left, self.right)
    }
}

/// Member sets of a candidate block or resolved cluster.
///
/// Bilateral memberships keep one set per collection and imply the full
/// `left x right` cross-product of comparisons; unilateral memberships hold
/// a single set and imply all `C(n,2)` in-order combinations. Pairs are
/// enumerated lazily — a membership is never expanded into a materialized
/// pair list by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Membership {
    Bilateral {
        left: Vec<EntityId>,
        right: Vec<EntityId>,
    },
    Unilateral(Vec<EntityId>),
}

impl Membership {
    /// Build a bilateral membership from D1 and D2 subsets.
    pub fn bilateral(left: Vec<EntityId>, right: Vec<EntityId>) -> Self {
        Self::Bilateral { left, right }
    }

    /// Build a unilateral membership from a single member set.
    pub fn unilateral(members: Vec<EntityId>) -> Self {
        Self::Unilateral(members)
    }

    /// Total number of members across both sides.
    pub fn len(&self) -> usize {
        match self {
            Self::Bilateral { left, right } => left.len() + right.len(),
            Self::Unilateral(members) => members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of comparisons this membership implies, without enumerating
    pub fn comparison_count(&self) -> u64 {
        match self {
            Self::Bilateral { left, right } => left.len() as u64 * right.len() as u64,
            Self::Unilateral(members) => {
                let n = members.len() as u64;
                n * n.saturating_sub(1) / 2
            }
        }
    }

    /// Lazily enumerate the comparison pairs implied by this membership.
    ///
    /// Bilateral: cross-product in (left-major, right-minor) order.
    /// Unilateral: combinations `(members[i], members[j])` with `i < j`.
    pub fn pairs(&self) -> Box<dyn Iterator<Item = ComparisonPair> + '_> {
        match self {
            Self::Bilateral { left, right } => Box::new(
                left.iter()
                    .flat_map(move |&l| right.iter().map(move |&r| ComparisonPair::new(l, r))),
            ),
            Self::Unilateral(members) => {
                Box::new(members.iter().enumerate().flat_map(move |(i, &a)| {
                    members[i + 1..]
                        .iter()
                        .map(move |&b| ComparisonPair::new(a, b))
                }))
            }
        }
    }
}

/// A group of entity identifiers restricting the comparison scope.
///
/// Blocks are immutable value objects: refinement stages consume a block
/// list and produce a new one, they never mutate blocks in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateBlock {
    pub id: BlockId,
    pub members: Membership,
}

impl CandidateBlock {
    pub fn new(id: BlockId, members: Membership) -> Self {
        Self { id, members }
    }

    /// Number of comparisons this block implies.
    pub fn comparison_count(&self) -> u64 {
        self.members.comparison_count()
    }

    /// Lazily enumerate this block's comparison pairs.
    pub fn comparisons(&self) -> Box<dyn Iterator<Item = ComparisonPair> + '_> {
        self.members.pairs()
    }
}

/// A comparison pair with the similarity the scoring stage assigned to it.
///
/// The metric label is opaque reporting metadata supplied by the stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPair {
    pub pair: ComparisonPair,
    pub score: f64,
    pub metric: Arc<str>,
}

impl ScoredPair {
    pub fn new(pair: ComparisonPair, score: f64, metric: Arc<str>) -> Self {
        Self {
            pair,
            score,
            metric,
        }
    }
}

/// A set of entity identifiers resolved to one real-world entity.
///
/// Members are partitioned by collection of origin through the same
/// [`Membership`] shape blocks use, and imply pairs under the same rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCluster {
    pub id: ClusterId,
    pub members: Membership,
}

impl ResolvedCluster {
    pub fn new(id: ClusterId, members: Membership) -> Self {
        Self { id, members }
    }

    /// Number of entity pairs this cluster asserts as duplicates.
    pub fn pair_count(&self) -> u64 {
        self.members.comparison_count()
    }

    /// Lazily enumerate the pairs this cluster asserts as duplicates.
    pub fn pairs(&self) -> Box<dyn Iterator<Item = ComparisonPair> + '_> {
        self.members.pairs()
    }
}

/// Quality metrics for one pipeline run, recomputed per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    /// Wall-clock span of the clustering stage, supplied by the caller.
    pub elapsed: Duration,
}

impl MetricResult {
    /// Derive a result from precision and recall.
    ///
    /// The F-measure is the harmonic mean, defined as 0 when both inputs
    /// are 0.
    pub fn new(precision: f64, recall: f64, elapsed: Duration) -> Self {
        let f_measure = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f_measure,
            elapsed,
        }
    }
}
