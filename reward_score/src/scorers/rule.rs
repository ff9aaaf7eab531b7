use super::components;
use crate::extract::{Extraction, StructureRewards, TagExtractor};
use crate::{GroundTruth, GroundTruthKind, Result, ScoreBreakdown, ScoreError, Scorer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleRewards {
    pub structure: StructureRewards,
    pub think_non_empty: f64,
    pub think_empty: f64,
    pub answer_non_empty: f64,
    pub answer_empty: f64,
}

impl Default for RuleRewards {
    fn default() -> Self {
        Self {
            structure: StructureRewards::default(),
            think_non_empty: 0.2,
            think_empty: -0.5,
            answer_non_empty: 0.5,
            answer_empty: -1.0,
        }
    }
}

impl RuleRewards {
    pub fn validate(&self) -> Result<()> {
        self.structure.validate()?;
        let all = [
            self.think_non_empty,
            self.think_empty,
            self.answer_non_empty,
            self.answer_empty,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(ScoreError::InvalidConfig(
                "rule rewards must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Structural template scorer: checks the response filled in both blocks.
/// Correctness is not judged and no ground truth is read.
#[derive(Debug, Clone, Default)]
pub struct RuleScorer {
    extractor: TagExtractor,
    rewards: RuleRewards,
}

impl RuleScorer {
    pub fn new(rewards: RuleRewards) -> Result<Self> {
        rewards.validate()?;
        Ok(Self {
            extractor: TagExtractor::new(rewards.structure),
            rewards,
        })
    }

    pub fn rewards(&self) -> &RuleRewards {
        &self.rewards
    }

    #[tracing::instrument(level = "trace", skip_all)]
    pub fn score_response(&self, response: &str) -> ScoreBreakdown {
        let (think, answer) = match self.extractor.extract(response) {
            Extraction::Rejected { score, reason } => {
                tracing::debug!(reason = reason.as_str(), score, "rule: structure rejected");
                return ScoreBreakdown::single(components::FORMAT, score);
            }
            Extraction::Accepted { think, answer } => (think, answer),
        };

        let r = &self.rewards;
        let think_score = if think.is_empty() {
            r.think_empty
        } else {
            r.think_non_empty
        };
        let answer_score = if answer.is_empty() {
            r.answer_empty
        } else {
            r.answer_non_empty
        };
        ScoreBreakdown::single(components::FORMAT, r.structure.accepted_score())
            .with(components::THINK_CONTENT, think_score)
            .with(components::ANSWER_CONTENT, answer_score)
    }
}

impl Scorer for RuleScorer {
    fn name(&self) -> &'static str {
        "rule"
    }

    fn ground_truth_kind(&self) -> GroundTruthKind {
        GroundTruthKind::Empty
    }

    fn score(&self, response: &str, _ground_truth: &GroundTruth) -> Result<ScoreBreakdown> {
        Ok(self.score_response(response))
    }
}
