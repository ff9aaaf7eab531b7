//! reward_core: turns a batch of RL rollouts into a reward grid.
//!
//! Decodes each sample through the tokenizer collaborator, dispatches it to the
//! domain scorer registered for its data source, and writes the scalar at the
//! last valid response token.

#![forbid(unsafe_code)]

pub mod batch;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod manager;
pub mod o11y;
pub mod registry;
pub mod report;
pub mod tokenizer;

pub use batch::{Batch, RewardOutput, Sample};
pub use config::RewardConfig;
pub use diagnostics::{Diagnostics, ExampleBudget, RewardStats};
pub use error::{Error, Result};
pub use manager::RewardManager;
pub use o11y::{TracingConfig, init_tracing};
pub use registry::ScorerRegistry;
pub use report::{BatchReport, ReportFormat, render_markdown_report, render_report};
pub use tokenizer::Tokenizer;

pub use reward_score;
