//! # Stage Contracts
//!
//! The five pipeline slots, each polymorphic over an externally supplied
//! strategy. The core never inspects a strategy beyond calling its slot
//! operation and reading its reporting metadata; names and configuration
//! strings are attached verbatim to diagnostics and result rows.
//!
//! Strategies return `anyhow::Result` so implementations can surface
//! whatever error type they carry; the orchestrator wraps failures with the
//! stage's name.

use crate::model::{CandidateBlock, EntityId, ResolvedCluster, ScoredPair};

/// Candidate generation: records in, candidate blocks out.
///
/// `d2` is present for bilateral (cross-collection) matching and absent for
/// unilateral deduplication. The core passes record identifiers only;
/// strategies that need record attributes capture them at construction.
pub trait CandidateGeneration: Send + Sync {
    /// Human-readable strategy name for reporting.
    fn name(&self) -> &str;

    /// Human-readable parameter summary for reporting.
    fn configuration(&self) -> String;

    fn generate(
        &self,
        d1: &[EntityId],
        d2: Option<&[EntityId]>,
    ) -> anyhow::Result<Vec<CandidateBlock>>;
}

/// Block or comparison refinement: a block list in, a refined list out.
///
/// Fills both refinement slots: block-granular cleaning and
/// comparison-granular cleaning share this signature, the difference is
/// internal to the strategy and opaque to the core.
pub trait BlockRefinement: Send + Sync {
    fn name(&self) -> &str;

    fn configuration(&self) -> String;

    fn refine(&self, blocks: Vec<CandidateBlock>) -> anyhow::Result<Vec<CandidateBlock>>;
}

/// Pairwise scoring: candidate blocks in, scored pairs out.
pub trait PairScoring: Send + Sync {
    fn name(&self) -> &str;

    fn configuration(&self) -> String;

    fn score(&self, blocks: &[CandidateBlock]) -> anyhow::Result<Vec<ScoredPair>>;
}

/// Clustering: scored pairs in, resolved entity clusters out.
///
/// The similarity threshold is passed per call because the grid-search
/// driver varies it per configuration while reusing one strategy.
pub trait Clustering: Send + Sync {
    fn name(&self) -> &str;

    fn configuration(&self) -> String;

    fn cluster(
        &self,
        pairs: &[ScoredPair],
        threshold: f64,
    ) -> anyhow::Result<Vec<ResolvedCluster>>;
}
