//! Error types for mapping construction.

use thiserror::Error;

/// Errors that can occur while building or writing a case mapping.
#[derive(Debug, Error)]
pub enum MappingError {
  /// The mapping table could not be read or the artifact written.
  #[error("mapping csv error: {0}")]
  Csv(#[from] csv::Error),

  /// Filesystem failure around the mapping artifact.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
