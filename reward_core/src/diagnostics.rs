use dashmap::DashMap;
use ndarray::Array2;
use reward_score::ScoreBreakdown;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key holding the per-sample total in `extra_info`.
pub const SCORE_KEY: &str = "score";

/// Min/max/mean over the non-zero cells of a reward grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub nonzero: usize,
}

impl RewardStats {
    pub fn from_grid(grid: &Array2<f32>) -> Self {
        let mut stats = Self {
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            ..Self::default()
        };
        let mut sum = 0.0f64;
        for &v in grid.iter().filter(|v| **v != 0.0) {
            stats.min = stats.min.min(v);
            stats.max = stats.max.max(v);
            sum += f64::from(v);
            stats.nonzero += 1;
        }
        if stats.nonzero == 0 {
            return Self::default();
        }
        stats.mean = (sum / stats.nonzero as f64) as f32;
        stats
    }
}

/// Bounded example logging: at most `limit` samples per domain over the
/// owner's lifetime. Safe to claim from several workers.
#[derive(Debug, Default)]
pub struct ExampleBudget {
    limit: usize,
    seen: DashMap<String, usize>,
}

impl ExampleBudget {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            seen: DashMap::new(),
        }
    }

    /// True if an example for `domain` may still be logged; consumes one
    /// slot when it does.
    pub fn claim(&self, domain: &str) -> bool {
        if self.limit == 0 {
            return false;
        }
        let mut seen = self.seen.entry(domain.to_string()).or_insert(0);
        if *seen >= self.limit {
            return false;
        }
        *seen += 1;
        true
    }

    pub fn seen(&self, domain: &str) -> usize {
        self.seen.get(domain).map(|v| *v).unwrap_or(0)
    }
}

/// Per-pass accumulator, filled in sample order after scoring.
#[derive(Debug, Default)]
pub struct Diagnostics {
    rows: Vec<(String, ScoreBreakdown)>,
}

impl Diagnostics {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            rows: Vec::with_capacity(n),
        }
    }

    pub fn record(&mut self, domain: &str, breakdown: ScoreBreakdown) {
        self.rows.push((domain.to_string(), breakdown));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Samples per domain.
    pub fn domains(&self) -> BTreeMap<String, usize> {
        let mut out = BTreeMap::new();
        for (domain, _) in &self.rows {
            *out.entry(domain.clone()).or_insert(0) += 1;
        }
        out
    }

    /// One sequence per component name plus [`SCORE_KEY`], each aligned to
    /// sample index. A sample without a component reads 0.0 there.
    pub fn extra_info(&self) -> BTreeMap<String, Vec<f64>> {
        let n = self.rows.len();
        let mut out: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        out.insert(SCORE_KEY.to_string(), vec![0.0; n]);
        for (i, (_, breakdown)) in self.rows.iter().enumerate() {
            if let Some(col) = out.get_mut(SCORE_KEY) {
                col[i] = breakdown.total();
            }
            for c in breakdown.components() {
                out.entry(c.name.clone()).or_insert_with(|| vec![0.0; n])[i] = c.value;
            }
        }
        out
    }
}
