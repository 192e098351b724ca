//! Error types for remote-service access.

use runlift_client::ClientError;
use thiserror::Error;

/// Errors surfaced by [`crate::TestService`] operations.
#[derive(Debug, Error)]
pub enum ApiError {
  /// Transport or HTTP-level failure from the underlying client.
  #[error(transparent)]
  Client(#[from] ClientError),

  /// The service answered 200 but reported a logical failure
  /// (`status: false` in the response envelope).
  #[error("service reported failure: {message}")]
  Service { message: String },

  /// The operation was cancelled before it completed.
  #[error("operation cancelled")]
  Cancelled,
}

impl ApiError {
  /// Whether a retry with backoff is worthwhile (429 or 5xx only).
  pub fn is_retryable(&self) -> bool {
    match self {
      ApiError::Client(err) => err.is_retryable(),
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn logical_failures_are_not_retryable() {
    let err = ApiError::Service {
      message: "bulk rejected".to_string(),
    };
    assert!(!err.is_retryable());
  }

  #[test]
  fn retryability_follows_the_client_error() {
    let err = ApiError::Client(ClientError::Status {
      status: 503,
      body: String::new(),
    });
    assert!(err.is_retryable());

    let err = ApiError::Client(ClientError::Status {
      status: 404,
      body: String::new(),
    });
    assert!(!err.is_retryable());
  }
}
