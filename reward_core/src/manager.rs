//! Batch reward pass.
//!
//! Each sample is scored independently (optionally on a rayon pool); results are
//! merged in sample order so the grid, diagnostics and example logs do not
//! depend on worker scheduling.

use crate::batch::{Batch, RewardOutput, Sample};
use crate::config::RewardConfig;
use crate::diagnostics::{Diagnostics, ExampleBudget, RewardStats};
use crate::registry::ScorerRegistry;
use crate::tokenizer::Tokenizer;
use crate::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;
use reward_score::{GroundTruth, ScoreBreakdown, truncate_chars};
use std::sync::Arc;

pub struct RewardManager {
    tokenizer: Arc<dyn Tokenizer>,
    registry: Arc<ScorerRegistry>,
    cfg: RewardConfig,
    examples: ExampleBudget,
    pool: Option<rayon::ThreadPool>,
}

/// Outcome of one sample, before it is placed in the grid.
struct Scored {
    domain: String,
    column: usize,
    prompt: String,
    response: String,
    breakdown: ScoreBreakdown,
}

impl RewardManager {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        registry: ScorerRegistry,
        cfg: RewardConfig,
    ) -> Result<Self> {
        cfg.validate()?;
        if registry.is_empty() {
            return Err(Error::InvalidConfig("scorer registry is empty".to_string()));
        }
        let pool = match cfg.max_workers {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("reward-worker-{i}"))
                    .build()
                    .map_err(|e| Error::Worker(format!("failed to build worker pool: {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            tokenizer,
            registry: Arc::new(registry),
            examples: ExampleBudget::new(cfg.num_examine),
            cfg,
            pool,
        })
    }

    pub fn config(&self) -> &RewardConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &ScorerRegistry {
        &self.registry
    }

    pub fn examples(&self) -> &ExampleBudget {
        &self.examples
    }

    /// Scores every sample and places each total at its last valid response
    /// token. A batch that already carries rewards is returned unchanged.
    ///
    /// Setup errors (unknown data source, empty response, malformed ground
    /// truth) abort the whole pass; the first failing sample by index is
    /// reported.
    #[tracing::instrument(level = "info", skip_all, fields(samples = batch.len()))]
    pub fn compute(&self, batch: &Batch) -> Result<RewardOutput> {
        if let Some(pre) = &batch.precomputed {
            tracing::debug!(shape = ?pre.shape(), "rewards precomputed; passing through");
            return Ok(RewardOutput::passthrough(pre.clone()));
        }

        let scored = self.score_all(&batch.samples).inspect_err(|e| {
            tracing::warn!(error = %e, "reward pass aborted");
        })?;

        let mut rewards = Array2::<f32>::zeros((batch.len(), batch.max_response_len()));
        let mut diagnostics = Diagnostics::with_capacity(scored.len());
        for (index, (sample, s)) in batch.samples.iter().zip(scored).enumerate() {
            let total = s.breakdown.total();
            rewards[[index, s.column]] = total as f32;
            self.log_example(index, sample, &s, total);
            diagnostics.record(&s.domain, s.breakdown);
        }

        let stats = RewardStats::from_grid(&rewards);
        let domains = diagnostics.domains();
        tracing::info!(
            samples = batch.len(),
            nonzero = stats.nonzero,
            min = stats.min,
            max = stats.max,
            mean = stats.mean,
            domains = ?domains,
            "reward pass complete"
        );

        Ok(RewardOutput {
            rewards,
            extra_info: diagnostics.extra_info(),
            domains,
            stats,
        })
    }

    /// Runs [`RewardManager::compute`] on tokio's blocking pool. Resolves only
    /// once the whole batch is scored.
    pub async fn compute_async(self: &Arc<Self>, batch: Batch) -> Result<RewardOutput> {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.compute(&batch))
            .await
            .map_err(|e| Error::Worker(format!("reward task failed: {e}")))?
    }

    fn score_all(&self, samples: &[Sample]) -> Result<Vec<Scored>> {
        if !self.cfg.parallel || samples.len() < 2 {
            return samples
                .iter()
                .enumerate()
                .map(|(i, s)| self.score_sample(i, s))
                .collect();
        }

        let run = || -> Vec<Result<Scored>> {
            samples
                .par_iter()
                .enumerate()
                .map(|(i, s)| self.score_sample(i, s))
                .collect()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        results.into_iter().collect()
    }

    #[tracing::instrument(level = "trace", skip(self, sample), fields(data_source = %sample.data_source))]
    fn score_sample(&self, index: usize, sample: &Sample) -> Result<Scored> {
        sample.check_shape(index)?;

        let column = sample
            .last_response_position()
            .ok_or_else(|| Error::EmptyResponse {
                index,
                data_source: sample.data_source.clone(),
            })?;

        let (Some(scorer), Some(domain)) = (
            self.registry.get(&sample.data_source),
            self.registry.resolve(&sample.data_source),
        ) else {
            return Err(Error::UnknownDataSource {
                index,
                data_source: sample.data_source.clone(),
            });
        };

        let ground_truth = GroundTruth::from_payload(scorer.ground_truth_kind(), &sample.ground_truth)
            .map_err(|source| Error::MalformedGroundTruth {
                index,
                data_source: sample.data_source.clone(),
                source,
            })?;

        let prompt = self.tokenizer.decode(&sample.valid_prompt_ids(), true);
        let response = self.tokenizer.decode(&sample.valid_response_ids(), true);

        let breakdown = scorer
            .score(&response, &ground_truth)
            .map_err(|source| Error::Scoring {
                index,
                data_source: sample.data_source.clone(),
                source,
            })?;

        Ok(Scored {
            domain: domain.to_string(),
            column,
            prompt,
            response,
            breakdown,
        })
    }

    fn log_example(&self, index: usize, sample: &Sample, s: &Scored, total: f64) {
        if !self.examples.claim(&s.domain) {
            return;
        }
        let max = self.cfg.max_log_chars;
        tracing::info!(
            index,
            data_source = %sample.data_source,
            scorer = %s.domain,
            prompt = truncate_chars(&s.prompt, max),
            response = truncate_chars(&s.response, max),
            ground_truth = %sample.ground_truth,
            breakdown = %s.breakdown,
            score = total,
            "reward example"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reward_score::UnavailableOracle;

    fn bytes_tokenizer() -> Arc<dyn Tokenizer> {
        Arc::new(|ids: &[u32], _skip: bool| -> String {
            ids.iter().filter_map(|&id| char::from_u32(id)).collect()
        })
    }

    fn encode(text: &str) -> Vec<u32> {
        text.chars().map(u32::from).collect()
    }

    fn manager(cfg: RewardConfig) -> RewardManager {
        RewardManager::new(
            bytes_tokenizer(),
            ScorerRegistry::with_builtin(UnavailableOracle).unwrap(),
            cfg,
        )
        .unwrap()
    }

    #[test]
    fn empty_registry_is_rejected() {
        let err = RewardManager::new(
            bytes_tokenizer(),
            ScorerRegistry::new(),
            RewardConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn writes_at_last_valid_token() {
        let response = encode("<think>a</think><answer>b</answer>");
        let len = response.len();
        let mut ids = response.clone();
        ids.extend([0, 0]);
        let mut mask = vec![true; 1 + len];
        mask.extend([false, false]);
        let batch = Batch::new(vec![Sample::new(vec![u32::from('q')], ids, mask, "rule")]);

        let out = manager(RewardConfig::default()).compute(&batch).unwrap();
        assert_eq!(out.rewards.shape(), &[1, len + 2]);
        assert!((out.rewards[[0, len - 1]] - 3.7).abs() < 1e-6);
        assert_eq!(out.stats.nonzero, 1);
        assert_eq!(out.domains["rule"], 1);
    }

    #[test]
    fn example_budget_is_per_scorer_and_survives_across_calls() {
        let m = manager(RewardConfig {
            num_examine: 1,
            ..Default::default()
        });
        let batch = Batch::new(
            ["format", "RULE", "rule", "kk"]
                .into_iter()
                .map(|src| Sample::new(vec![], encode("x"), vec![true], src))
                .collect(),
        );
        m.compute(&batch).unwrap();
        m.compute(&batch).unwrap();
        assert_eq!(m.examples().seen("rule"), 1);
        assert_eq!(m.examples().seen("logic_puzzle"), 1);
        assert_eq!(m.examples().seen("format"), 0);
    }
}
