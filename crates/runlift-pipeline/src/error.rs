//! Error types for pipeline execution.

use runlift_api::ApiError;
use thiserror::Error;

/// Errors that can occur while migrating one run group.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// A remote operation failed outside the retry path.
  #[error(transparent)]
  Api(#[from] ApiError),

  /// A chunk exhausted its backoff schedule; remaining chunks for the
  /// run were not attempted.
  #[error("chunk {chunk}/{total} failed after {attempts} attempts: {source}")]
  ChunkExhausted {
    chunk: usize,
    total: usize,
    attempts: usize,
    #[source]
    source: ApiError,
  },

  /// The run-group task was cancelled before it completed.
  #[error("run-group migration cancelled")]
  Cancelled,
}
