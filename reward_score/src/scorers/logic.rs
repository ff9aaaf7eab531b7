//! Knights-and-knaves style puzzle scorer.
//!
//! Adds four independent components: structure, reasoning length, entity
//! mentions in the reasoning block, and role assertions in the answer block.
//! Nothing past the structure check runs when the structure is rejected.

use super::components;
use crate::extract::{Extraction, StructureRewards, TagExtractor};
use crate::{GroundTruth, GroundTruthKind, Result, ScoreBreakdown, ScoreError, Scorer};
use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogicRewards {
    pub structure: StructureRewards,
    pub empty_answer: f64,
    pub per_assertion: f64,
    /// Length reward at an empty reasoning block.
    pub min_length_reward: f64,
    /// Length reward at and beyond `target_length`.
    pub max_length_reward: f64,
    /// Reasoning length (characters) that earns the full length reward.
    pub target_length: f64,
    pub per_entity_mention: f64,
}

impl Default for LogicRewards {
    fn default() -> Self {
        Self {
            structure: StructureRewards {
                tag_present: 0.5,
                missing_or_duplicate: -4.0,
                order_correct: 1.0,
                order_incorrect: -5.0,
            },
            empty_answer: -2.0,
            per_assertion: 4.0,
            min_length_reward: -4.0,
            max_length_reward: 4.0,
            target_length: 2000.0,
            per_entity_mention: 1.0,
        }
    }
}

impl LogicRewards {
    pub fn validate(&self) -> Result<()> {
        self.structure.validate()?;
        let all = [
            self.empty_answer,
            self.per_assertion,
            self.min_length_reward,
            self.max_length_reward,
            self.target_length,
            self.per_entity_mention,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(ScoreError::InvalidConfig(
                "logic rewards must be finite".to_string(),
            ));
        }
        if self.target_length <= 0.0 {
            return Err(ScoreError::InvalidConfig(
                "target_length must be > 0".to_string(),
            ));
        }
        if self.max_length_reward < self.min_length_reward {
            return Err(ScoreError::InvalidConfig(
                "max_length_reward must be >= min_length_reward".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LogicPuzzleScorer {
    extractor: TagExtractor,
    rewards: LogicRewards,
}

impl Default for LogicPuzzleScorer {
    fn default() -> Self {
        let rewards = LogicRewards::default();
        Self {
            extractor: TagExtractor::new(rewards.structure),
            rewards,
        }
    }
}

impl LogicPuzzleScorer {
    pub fn new(rewards: LogicRewards) -> Result<Self> {
        rewards.validate()?;
        Ok(Self {
            extractor: TagExtractor::new(rewards.structure),
            rewards,
        })
    }

    pub fn rewards(&self) -> &LogicRewards {
        &self.rewards
    }

    #[tracing::instrument(level = "trace", skip_all, fields(entities = roles.len()))]
    pub fn score_with_roles(
        &self,
        response: &str,
        roles: &BTreeMap<String, String>,
    ) -> ScoreBreakdown {
        let (think, answer) = match self.extractor.extract(response) {
            Extraction::Rejected { score, reason } => {
                tracing::debug!(reason = reason.as_str(), score, "logic: structure rejected");
                return ScoreBreakdown::single(components::FORMAT, score);
            }
            Extraction::Accepted { think, answer } => (think, answer),
        };

        let mut out = ScoreBreakdown::single(
            components::FORMAT,
            self.rewards.structure.accepted_score(),
        );
        out.push(
            components::LENGTH,
            self.length_score(think.chars().count()),
        );
        out.push(components::KEYWORD_QUALITY, self.mention_score(&think, roles));

        let answer_score = if answer.is_empty() || roles.is_empty() {
            self.rewards.empty_answer
        } else {
            self.assertion_score(&answer, roles)
        };
        out.push(components::ANSWER_MATCH, answer_score);
        out
    }

    /// Linear from `min_length_reward` at 0 chars to `max_length_reward` at
    /// `target_length`, flat afterwards.
    pub fn length_score(&self, chars: usize) -> f64 {
        let r = &self.rewards;
        let slope = (r.max_length_reward - r.min_length_reward) / r.target_length;
        (slope * chars as f64 + r.min_length_reward).min(r.max_length_reward)
    }

    /// Bonus per entity named as a whole word in the reasoning block.
    pub fn mention_score(&self, think: &str, roles: &BTreeMap<String, String>) -> f64 {
        let patterns = roles
            .keys()
            .filter(|name| !name.trim().is_empty())
            .map(|name| format!(r"\b{}\b", regex::escape(name)));
        let mentioned = whole_word_set(patterns).map_or(0, |set| set.matches(think).iter().count());
        mentioned as f64 * self.rewards.per_entity_mention
    }

    /// Bonus per `(name, role)` pair asserted on one line of the answer, name
    /// first, both as whole words.
    ///
    /// A line is only checked for the name followed later by the role, so one
    /// line naming several entities and ending in a role word can confirm more
    /// than one pair.
    pub fn assertion_score(&self, answer: &str, roles: &BTreeMap<String, String>) -> f64 {
        let patterns = roles
            .iter()
            .filter(|(name, role)| !name.trim().is_empty() && !role.trim().is_empty())
            .map(|(name, role)| {
                format!(
                    r"\b{}\b.*\b{}\b",
                    regex::escape(name),
                    regex::escape(role)
                )
            });
        let confirmed = whole_word_set(patterns).map_or(0, |set| set.matches(answer).iter().count());
        confirmed as f64 * self.rewards.per_assertion
    }
}

/// One case-insensitive set per call; `.` stops at newlines, so every pattern
/// is confined to a single line.
fn whole_word_set(patterns: impl IntoIterator<Item = String>) -> Option<RegexSet> {
    match RegexSetBuilder::new(patterns).case_insensitive(true).build() {
        Ok(set) => Some(set),
        Err(e) => {
            tracing::debug!(%e, "logic: skipping unbuildable pattern set");
            None
        }
    }
}

impl Scorer for LogicPuzzleScorer {
    fn name(&self) -> &'static str {
        "logic_puzzle"
    }

    fn ground_truth_kind(&self) -> GroundTruthKind {
        GroundTruthKind::RoleMap
    }

    fn score(&self, response: &str, ground_truth: &GroundTruth) -> Result<ScoreBreakdown> {
        let Some(roles) = ground_truth.roles() else {
            return Err(ScoreError::GroundTruthMismatch {
                scorer: self.name(),
                expected: GroundTruthKind::RoleMap,
                actual: ground_truth.kind(),
            });
        };
        Ok(self.score_with_roles(response, roles))
    }
}
