//! HTTP client wrapper with workspace authentication.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An authenticated client for one workspace.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct Client {
  base_url: Url,
  token: String,
  http: reqwest::Client,
}

impl Client {
  /// Create a client for the workspace at `base_url`.
  pub fn new(base_url: &str, token: &str) -> Result<Self, ClientError> {
    let http = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()?;

    Ok(Self {
      base_url: Url::parse(base_url)?,
      token: token.to_string(),
      http,
    })
  }

  /// The workspace base URL this client talks to.
  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Perform a GET and decode the JSON response body.
  pub async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T, ClientError> {
    let url = self.endpoint(path)?;
    let response = self
      .http
      .get(url)
      .query(query)
      .header("X-Token", &self.token)
      .header(ACCEPT, "application/json")
      .send()
      .await?;

    self.decode(response).await
  }

  /// Perform a POST with a JSON body and decode the JSON response body.
  pub async fn post_json<B: Serialize, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, ClientError> {
    let url = self.endpoint(path)?;
    let response = self
      .http
      .post(url)
      .json(body)
      .header("X-Token", &self.token)
      .header(ACCEPT, "application/json")
      .header(CONTENT_TYPE, "application/json")
      .send()
      .await?;

    self.decode(response).await
  }

  fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
    Ok(self.base_url.join(&format!("/v1{}", path))?)
  }

  async fn decode<T: DeserializeOwned>(
    &self,
    response: reqwest::Response,
  ) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
      return Err(ClientError::Status {
        status: status.as_u16(),
        body,
      });
    }

    serde_json::from_str(&body).map_err(|source| ClientError::Decode { source, body })
  }
}

/// Mask a token for log output, keeping only the first 8 and last 4 characters.
pub fn mask_token(token: &str) -> String {
  if token.is_empty() {
    return "<not set>".to_string();
  }
  let count = token.chars().count();
  if count <= 12 {
    return "***".to_string();
  }
  // char-based slicing: tokens are operator input and not guaranteed ASCII
  let head: String = token.chars().take(8).collect();
  let tail: String = token.chars().skip(count - 4).collect();
  format!("{head}...{tail}")
}
