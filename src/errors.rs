//! Error types for pipeline construction and engine switching.
//!
//! Most pipeline operations cannot fail. The failures that remain are
//! construction and replay misuse, reported through [`PipelineError`].
//! A panicking user callback is not an error value: it aborts the
//! evaluation and is re-raised on the calling thread.

use crate::pipeline::OperationTag;
use thiserror::Error;

/// Error type for flowline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A parallel engine was requested with fewer than one worker.
    #[error("Invalid concurrency degree {degree}: a parallel pipeline needs at least one worker")]
    InvalidConcurrency { degree: usize },

    /// A textual operation tag did not name any known operation.
    #[error("Unsupported operation type found: {0}")]
    UnknownOperation(String),

    /// A recorded operation was replayed onto a pipeline of another element type.
    #[error("Type mismatch while replaying {tag} operation")]
    ReplayTypeMismatch { tag: OperationTag },

    /// A replayed log ended on an element type other than the original pipeline's.
    #[error("Replayed pipeline does not produce the original element type")]
    ReplayOutputMismatch,

    /// The worker pool could not be started.
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns true for errors caused by how the caller built the pipeline.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::InvalidConcurrency { .. }
                | Self::UnknownOperation(_)
                | Self::ReplayTypeMismatch { .. }
                | Self::ReplayOutputMismatch
                | Self::Config(_)
        )
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias using [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;
