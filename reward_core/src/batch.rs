use crate::diagnostics::RewardStats;
use crate::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One rollout. `attention_mask` covers the prompt positions followed by the
/// response positions, 1:1 with `prompt_ids` then `response_ids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub prompt_ids: Vec<u32>,
    pub response_ids: Vec<u32>,
    pub attention_mask: Vec<bool>,
    pub data_source: String,
    #[serde(default)]
    pub ground_truth: serde_json::Value,
}

impl Sample {
    pub fn new(
        prompt_ids: Vec<u32>,
        response_ids: Vec<u32>,
        attention_mask: Vec<bool>,
        data_source: impl Into<String>,
    ) -> Self {
        Self {
            prompt_ids,
            response_ids,
            attention_mask,
            data_source: data_source.into(),
            ground_truth: serde_json::Value::Null,
        }
    }

    pub fn with_ground_truth(mut self, ground_truth: serde_json::Value) -> Self {
        self.ground_truth = ground_truth;
        self
    }

    pub(crate) fn check_shape(&self, index: usize) -> Result<()> {
        let expected = self.prompt_ids.len() + self.response_ids.len();
        if self.attention_mask.len() != expected {
            return Err(Error::ShapeMismatch {
                index,
                detail: format!(
                    "attention mask has {} positions, prompt + response have {expected}",
                    self.attention_mask.len()
                ),
            });
        }
        Ok(())
    }

    fn prompt_mask(&self) -> &[bool] {
        &self.attention_mask[..self.prompt_ids.len().min(self.attention_mask.len())]
    }

    fn response_mask(&self) -> &[bool] {
        &self.attention_mask[self.prompt_ids.len().min(self.attention_mask.len())..]
    }

    pub fn valid_prompt_ids(&self) -> Vec<u32> {
        select(&self.prompt_ids, self.prompt_mask())
    }

    pub fn valid_response_ids(&self) -> Vec<u32> {
        select(&self.response_ids, self.response_mask())
    }

    /// Index into `response_ids` of the last valid response token.
    pub fn last_response_position(&self) -> Option<usize> {
        self.response_mask()
            .iter()
            .take(self.response_ids.len())
            .rposition(|&m| m)
    }
}

fn select(ids: &[u32], mask: &[bool]) -> Vec<u32> {
    ids.iter()
        .zip(mask)
        .filter_map(|(&id, &m)| m.then_some(id))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub samples: Vec<Sample>,
    /// Scores attached upstream; returned as-is by the reward manager.
    pub precomputed: Option<Array2<f32>>,
}

impl Batch {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples,
            precomputed: None,
        }
    }

    pub fn with_precomputed(mut self, rewards: Array2<f32>) -> Self {
        self.precomputed = Some(rewards);
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Width of the reward grid: the longest response in the batch.
    pub fn max_response_len(&self) -> usize {
        self.samples
            .iter()
            .map(|s| s.response_ids.len())
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewardOutput {
    /// `[batch, max_response_len]`; at most one non-zero cell per row.
    pub rewards: Array2<f32>,
    /// "score" plus one key per breakdown component, each aligned to sample index.
    pub extra_info: BTreeMap<String, Vec<f64>>,
    /// Samples per canonical scorer id.
    pub domains: BTreeMap<String, usize>,
    pub stats: RewardStats,
}

impl RewardOutput {
    pub(crate) fn passthrough(rewards: Array2<f32>) -> Self {
        let stats = RewardStats::from_grid(&rewards);
        Self {
            rewards,
            extra_info: BTreeMap::new(),
            domains: BTreeMap::new(),
            stats,
        }
    }

    /// Row-wise reward: the single written cell of each row.
    pub fn sequence_rewards(&self) -> Vec<f32> {
        self.rewards.rows().into_iter().map(|r| r.sum()).collect()
    }
}
