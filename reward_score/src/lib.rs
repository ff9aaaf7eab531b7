//! reward_score: structural extraction and domain scorers for RL reward shaping.
//!
//! Parses `<think>`/`<answer>` (and `<SMILES>`) delimited responses, runs the
//! domain scorer for a sample, and returns a named, additive score breakdown.

#![forbid(unsafe_code)]

pub mod breakdown;
pub mod extract;
pub mod ground_truth;
pub mod oracle;
pub mod scorers;

pub type Result<T> = std::result::Result<T, ScoreError>;

#[derive(thiserror::Error, Debug)]
pub enum ScoreError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("malformed ground truth: {0}")]
    MalformedGroundTruth(String),

    #[error("scorer {scorer} cannot use {actual:?} ground truth (expects {expected:?})")]
    GroundTruthMismatch {
        scorer: &'static str,
        expected: GroundTruthKind,
        actual: GroundTruthKind,
    },
}

/// A domain scorer: consumes a decoded response (and the sample's ground truth)
/// and returns the additive score breakdown for it.
///
/// Implementations must be pure with respect to their inputs; the reward manager
/// calls them from several worker threads at once.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    /// The ground-truth shape this scorer consumes. The reward manager builds the
    /// sample's [`GroundTruth`] with this kind before calling [`Scorer::score`].
    fn ground_truth_kind(&self) -> GroundTruthKind;

    fn score(&self, response: &str, ground_truth: &GroundTruth) -> Result<ScoreBreakdown>;
}

pub use breakdown::{Component, ScoreBreakdown};
pub use extract::{
    Extraction, RejectReason, StructureRewards, TagExtractor, TagKind, TagSpan, truncate_chars,
};
pub use ground_truth::{GroundTruth, GroundTruthKind};
pub use oracle::{OracleError, PropertyOracle, SerializedOracle, UnavailableOracle};
pub use scorers::logic::{LogicPuzzleScorer, LogicRewards};
pub use scorers::molecule::{MoleculeRewards, MoleculeScorer};
pub use scorers::rule::{RuleRewards, RuleScorer};
