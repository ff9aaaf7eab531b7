use reward_score::ScoreError;

/// Errors that abort a whole reward pass.
///
/// Malformed model output never lands here; it is scored with a penalty.
/// These variants are setup bugs and carry the sample index and data source
/// needed to find them.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("sample {index}: no scorer registered for data source {data_source:?}")]
    UnknownDataSource { index: usize, data_source: String },

    #[error("sample {index} ({data_source}): response has no valid tokens")]
    EmptyResponse { index: usize, data_source: String },

    #[error("sample {index}: {detail}")]
    ShapeMismatch { index: usize, detail: String },

    #[error("sample {index} ({data_source}): malformed ground truth")]
    MalformedGroundTruth {
        index: usize,
        data_source: String,
        #[source]
        source: ScoreError,
    },

    #[error("sample {index} ({data_source}): scorer failed")]
    Scoring {
        index: usize,
        data_source: String,
        #[source]
        source: ScoreError,
    },

    #[error("reward worker failed: {0}")]
    Worker(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
