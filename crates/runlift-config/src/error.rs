//! Error types for configuration loading.

use thiserror::Error;

/// Fatal configuration errors, raised before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
  /// A required variable is not set (or required by the selected mode).
  #[error("required environment variable {name} is not set")]
  MissingVar { name: String },

  /// A variable is set but cannot be parsed.
  #[error("invalid value '{value}' for {name}: {reason}")]
  InvalidVar {
    name: String,
    value: String,
    reason: String,
  },

  /// The selected match mode is not one we know.
  #[error("unsupported match mode: {mode}")]
  UnsupportedMode { mode: String },
}
