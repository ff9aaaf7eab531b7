use crate::batch::RewardOutput;
use crate::diagnostics::{RewardStats, SCORE_KEY};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ulid::Ulid;

/// Summary of one reward pass, for run logs and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub id: Ulid,
    pub created_at: DateTime<Utc>,
    pub samples: usize,
    pub stats: RewardStats,
    pub domains: BTreeMap<String, usize>,
    /// Batch mean of each breakdown component (and of the total score).
    pub component_means: BTreeMap<String, f64>,
}

impl BatchReport {
    pub fn from_output(output: &RewardOutput) -> Self {
        let samples = output.rewards.nrows();
        let component_means = output
            .extra_info
            .iter()
            .map(|(k, v)| {
                let mean = if v.is_empty() {
                    0.0
                } else {
                    v.iter().sum::<f64>() / v.len() as f64
                };
                (k.clone(), mean)
            })
            .collect();
        Self {
            id: Ulid::new(),
            created_at: Utc::now(),
            samples,
            stats: output.stats,
            domains: output.domains.clone(),
            component_means,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    JsonPretty,
}

#[tracing::instrument(skip_all)]
pub fn render_markdown_report(report: &BatchReport) -> String {
    let mut s = String::new();
    s.push_str("# Reward Batch Report\n\n");
    s.push_str(&format!("- report_id: `{}`\n", report.id));
    s.push_str(&format!("- created_at: `{}`\n", report.created_at.to_rfc3339()));
    s.push_str(&format!("- samples: `{}`\n", report.samples));
    s.push_str(&format!("- nonzero: `{}`\n", report.stats.nonzero));
    s.push_str(&format!(
        "- reward min/mean/max: `{:.4}` / `{:.4}` / `{:.4}`\n",
        report.stats.min, report.stats.mean, report.stats.max
    ));

    if !report.domains.is_empty() {
        s.push_str("\n## Domains\n\n");
        s.push_str("| scorer | samples |\n");
        s.push_str("|--------|---------|\n");
        for (domain, n) in &report.domains {
            s.push_str(&format!("| {domain} | {n} |\n"));
        }
    }

    if !report.component_means.is_empty() {
        s.push_str("\n## Components\n\n");
        s.push_str("| component | mean |\n");
        s.push_str("|-----------|------|\n");
        // Total first, then components alphabetically.
        if let Some(v) = report.component_means.get(SCORE_KEY) {
            s.push_str(&format!("| {SCORE_KEY} | {v:.4} |\n"));
        }
        for (name, v) in report
            .component_means
            .iter()
            .filter(|(k, _)| k.as_str() != SCORE_KEY)
        {
            s.push_str(&format!("| {name} | {v:.4} |\n"));
        }
    }
    s
}

#[tracing::instrument(skip_all)]
pub fn render_report(report: &BatchReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Markdown => Ok(render_markdown_report(report)),
        ReportFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn output() -> RewardOutput {
        let mut extra_info = BTreeMap::new();
        extra_info.insert("score".to_string(), vec![3.0, -1.0]);
        extra_info.insert("format".to_string(), vec![3.0, 1.0]);
        let mut domains = BTreeMap::new();
        domains.insert("rule".to_string(), 2);
        let rewards = array![[0.0, 3.0], [-1.0, 0.0]];
        RewardOutput {
            stats: RewardStats::from_grid(&rewards),
            rewards,
            extra_info,
            domains,
        }
    }

    #[test]
    fn report_means_components() {
        let r = BatchReport::from_output(&output());
        assert_eq!(r.samples, 2);
        assert_eq!(r.component_means["score"], 1.0);
        assert_eq!(r.component_means["format"], 2.0);
    }

    #[test]
    fn markdown_lists_total_before_components() {
        let md = render_markdown_report(&BatchReport::from_output(&output()));
        assert!(md.starts_with("# Reward Batch Report"));
        assert!(md.contains("| rule | 2 |"));
        let score = md.find("| score |").unwrap();
        let format = md.find("| format |").unwrap();
        assert!(score < format);
    }

    #[test]
    fn json_round_trips() {
        let r = BatchReport::from_output(&output());
        let json = render_report(&r, ReportFormat::JsonPretty).unwrap();
        let back: BatchReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, r.id);
        assert_eq!(back.domains, r.domains);
    }
}
