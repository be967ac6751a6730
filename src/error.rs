//! Error types for the benchmarking core.
//!
//! Construction-time errors (ground truth, empty input) abort a sweep before
//! any run starts. Per-run errors (configuration, stage failure) are caught
//! by the grid-search driver and recorded as failed result rows.

use thiserror::Error;

/// Result type for benchmarking operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for benchmarking operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A ground-truth fact references an entity absent from the declared
    /// collections, or an equivalence group is malformed.
    #[error("invalid ground truth: {0}")]
    InvalidGroundTruth(String),

    /// A stage rejected its parameters before execution.
    #[error("invalid configuration for {stage}: {message}")]
    InvalidConfiguration { stage: String, message: String },

    /// A required record collection was empty.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// An external stage strategy failed during execution.
    #[error("stage {stage} failed: {source}")]
    StageFailure {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// The result sink could not be written.
    #[error("result sink error: {0}")]
    Sink(#[from] csv::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid ground truth error.
    pub fn invalid_ground_truth(msg: impl Into<String>) -> Self {
        Self::InvalidGroundTruth(msg.into())
    }

    /// Create an invalid configuration error for a named stage.
    pub fn invalid_configuration(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Wrap a stage strategy failure with the failing stage's name.
    pub fn stage_failure(stage: impl Into<String>, source: anyhow::Error) -> Self {
        Self::StageFailure {
            stage: stage.into(),
            source,
        }
    }

    /// The stage a per-run error originated from, if any.
    ///
    /// Used by the grid-search driver to label failed result rows.
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            Self::InvalidConfiguration { stage, .. } | Self::StageFailure { stage, .. } => {
                Some(stage)
            }
            _ => None,
        }
    }
}
