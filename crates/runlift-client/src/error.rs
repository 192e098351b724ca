//! Error types for HTTP client operations.

use thiserror::Error;

/// Errors that can occur while talking to a workspace API.
#[derive(Debug, Error)]
pub enum ClientError {
  /// The configured base URL could not be parsed or joined.
  #[error("invalid API url: {0}")]
  Url(#[from] url::ParseError),

  /// The request could not be sent or the response body could not be read.
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// The server answered outside the success class.
  #[error("API request failed with status {status}: {body}")]
  Status { status: u16, body: String },

  /// The response body was not the JSON shape we expected.
  #[error("failed to decode API response: {source}")]
  Decode {
    #[source]
    source: serde_json::Error,
    body: String,
  },
}

impl ClientError {
  /// Whether a retry with backoff is worthwhile.
  ///
  /// Only rate limiting (429) and server-side failures (5xx) qualify;
  /// every other failure is treated as permanent.
  pub fn is_retryable(&self) -> bool {
    match self {
      ClientError::Status { status, .. } => *status == 429 || (500..600).contains(status),
      _ => false,
    }
  }

  /// The HTTP status carried by this error, if any.
  pub fn status(&self) -> Option<u16> {
    match self {
      ClientError::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rate_limit_and_server_errors_are_retryable() {
    for status in [429, 500, 502, 503, 599] {
      let err = ClientError::Status {
        status,
        body: String::new(),
      };
      assert!(err.is_retryable(), "status {} should be retryable", status);
    }
  }

  #[test]
  fn client_errors_are_not_retryable() {
    for status in [400, 401, 403, 404, 422] {
      let err = ClientError::Status {
        status,
        body: String::new(),
      };
      assert!(!err.is_retryable(), "status {} should not be retryable", status);
    }
  }

  #[test]
  fn decode_errors_are_not_retryable() {
    let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err = ClientError::Decode {
      source,
      body: "{".to_string(),
    };
    assert!(!err.is_retryable());
  }
}
