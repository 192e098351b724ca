//! HTTP implementation of [`TestService`].
//!
//! Endpoint shapes follow the service's v1 API: offset pagination on
//! list endpoints, a `{status, result}` envelope on every response, and
//! `run_id[]` filters on result queries.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use runlift_client::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::fetch::{FetchOutcome, MAX_PAGES, PAGE_SIZE, fetch_paged};
use crate::service::TestService;
use crate::types::{ApiResponse, BulkItem, BulkRequest, Case, ListResult, Run, SourceRecord};

/// Delay between result pages, to stay clear of rate limits.
const RESULT_PAGE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
struct CreatedRun {
  id: u64,
}

#[derive(Debug, Deserialize)]
struct BulkResult {
  #[serde(default = "Vec::new")]
  bulk: Vec<crate::types::BulkOutcome>,
}

/// [`TestService`] backed by the real API through a [`Client`].
#[derive(Debug, Clone)]
pub struct HttpTestService {
  client: Client,
}

impl HttpTestService {
  pub fn new(client: Client) -> Self {
    Self { client }
  }

  /// Unwrap the response envelope, turning `status: false` into a
  /// logical service failure.
  fn unwrap_envelope<T>(response: ApiResponse<T>, context: &str) -> Result<T, ApiError> {
    if !response.status {
      return Err(ApiError::Service {
        message: format!("{} returned status false", context),
      });
    }
    Ok(response.result)
  }

  async fn result_page(
    &self,
    project: &str,
    query: Vec<(&'static str, String)>,
  ) -> Result<Vec<SourceRecord>, ApiError> {
    let response: ApiResponse<ListResult<SourceRecord>> = self
      .client
      .get_json(&format!("/result/{}", project), &query)
      .await?;
    Ok(Self::unwrap_envelope(response, "result list")?.entities)
  }
}

#[async_trait]
impl TestService for HttpTestService {
  async fn results_completed_after(
    &self,
    project: &str,
    after: DateTime<Utc>,
    cancel: &CancellationToken,
  ) -> Result<FetchOutcome<SourceRecord>, ApiError> {
    let from = after.format("%Y-%m-%d %H:%M:%S").to_string();

    fetch_paged("results", cancel, Some(RESULT_PAGE_DELAY), |limit, offset| {
      let from = from.clone();
      async move {
        self
          .result_page(
            project,
            vec![
              ("limit", limit.to_string()),
              ("offset", offset.to_string()),
              ("from_end_time", from),
            ],
          )
          .await
      }
    })
    .await
  }

  async fn cases(
    &self,
    project: &str,
    cancel: &CancellationToken,
  ) -> Result<FetchOutcome<Case>, ApiError> {
    // Cases get a dedicated loop: pages can repeat entities, so we
    // dedup by id and also stop early when a page contributes nothing
    // new (a repeating server would otherwise run to the page ceiling).
    let mut seen: HashMap<u64, Case> = HashMap::new();
    let mut order: Vec<u64> = Vec::new();
    let mut offset = 0usize;
    let mut pages = 0u32;
    let mut truncated = false;

    loop {
      if cancel.is_cancelled() {
        return Err(ApiError::Cancelled);
      }

      if pages >= MAX_PAGES {
        warn!(project, pages, "case page ceiling reached; result set is truncated");
        truncated = true;
        break;
      }

      let query = vec![
        ("limit", PAGE_SIZE.to_string()),
        ("offset", offset.to_string()),
      ];
      let response: ApiResponse<ListResult<Case>> = self
        .client
        .get_json(&format!("/case/{}", project), &query)
        .await?;
      let entities = Self::unwrap_envelope(response, "case list")?.entities;
      pages += 1;

      let batch = entities.len();
      let mut fresh = 0usize;
      for case in entities {
        // first occurrence wins; later duplicates are dropped
        if !seen.contains_key(&case.id) {
          order.push(case.id);
          fresh += 1;
          seen.insert(case.id, case);
        }
      }

      info!(
        project,
        page = pages,
        offset,
        batch,
        fresh,
        total = seen.len(),
        "fetched case page"
      );

      if batch < PAGE_SIZE {
        break;
      }
      if fresh == 0 {
        warn!(
          project,
          page = pages,
          "case page contributed no new ids; stopping early"
        );
        break;
      }
      offset += PAGE_SIZE;
    }

    let items = order
      .into_iter()
      .filter_map(|id| seen.remove(&id))
      .collect();

    Ok(FetchOutcome {
      items,
      truncated,
      pages,
    })
  }

  async fn runs(
    &self,
    project: &str,
    cancel: &CancellationToken,
  ) -> Result<FetchOutcome<Run>, ApiError> {
    fetch_paged("runs", cancel, None, |limit, offset| async move {
      let query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
      let response: ApiResponse<ListResult<Run>> = self
        .client
        .get_json(&format!("/run/{}", project), &query)
        .await?;
      Ok(Self::unwrap_envelope(response, "run list")?.entities)
    })
    .await
  }

  async fn run(&self, project: &str, run_id: u64) -> Result<Run, ApiError> {
    let response: ApiResponse<Run> = self
      .client
      .get_json(&format!("/run/{}/{}", project, run_id), &[])
      .await?;
    Self::unwrap_envelope(response, "run fetch")
  }

  async fn create_run(
    &self,
    project: &str,
    title: &str,
    description: &str,
  ) -> Result<Run, ApiError> {
    let body = serde_json::json!({
      "title": title,
      "description": description,
      "include": "cases",
    });

    let response: ApiResponse<CreatedRun> = self
      .client
      .post_json(&format!("/run/{}", project), &body)
      .await?;
    let created = Self::unwrap_envelope(response, "run creation")?;

    info!(project, run_id = created.id, title, "created run");
    self.run(project, created.id).await
  }

  async fn run_has_results(&self, project: &str, run_id: u64) -> Result<bool, ApiError> {
    let query = vec![
      ("limit", "1".to_string()),
      ("offset", "0".to_string()),
      ("run_id[]", run_id.to_string()),
    ];
    let response: ApiResponse<ListResult<SourceRecord>> = self
      .client
      .get_json(&format!("/result/{}", project), &query)
      .await?;
    Ok(!Self::unwrap_envelope(response, "result probe")?.entities.is_empty())
  }

  async fn case_ids_in_run(
    &self,
    project: &str,
    run_id: u64,
    cancel: &CancellationToken,
  ) -> Result<HashSet<u64>, ApiError> {
    let outcome = fetch_paged("run results", cancel, None, |limit, offset| async move {
      self
        .result_page(
          project,
          vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("run_id[]", run_id.to_string()),
          ],
        )
        .await
    })
    .await?;

    if outcome.truncated {
      warn!(
        project,
        run_id,
        pages = outcome.pages,
        "existing-result scan hit the page ceiling; the already-posted set is incomplete"
      );
    }

    Ok(outcome.items.into_iter().map(|r| r.case_id).collect())
  }

  async fn post_results(
    &self,
    project: &str,
    run_id: u64,
    items: &[BulkItem],
  ) -> Result<(), ApiError> {
    let body = BulkRequest { results: items };
    let response: ApiResponse<BulkResult> = self
      .client
      .post_json(&format!("/result/{}/{}/bulk", project, run_id), &body)
      .await?;
    let result = Self::unwrap_envelope(response, "bulk create")?;

    let rejected = result.bulk.iter().filter(|o| !o.status).count();
    if rejected > 0 {
      return Err(ApiError::Service {
        message: format!("bulk create rejected {} of {} items", rejected, items.len()),
      });
    }

    Ok(())
  }
}
