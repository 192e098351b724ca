//! The trait boundary between the pipeline and the remote service.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::fetch::FetchOutcome;
use crate::types::{BulkItem, Case, Run, SourceRecord};

/// Remote test-management operations consumed by the migration pipeline.
///
/// Implementations must be safe to share across concurrent run-group
/// tasks; all methods take `&self`.
#[async_trait]
pub trait TestService: Send + Sync {
  /// All results completed after `after`, in no particular order.
  /// No dedup is applied; the caller trusts the returned set.
  async fn results_completed_after(
    &self,
    project: &str,
    after: DateTime<Utc>,
    cancel: &CancellationToken,
  ) -> Result<FetchOutcome<SourceRecord>, ApiError>;

  /// All cases of a project, deduplicated by case id.
  async fn cases(
    &self,
    project: &str,
    cancel: &CancellationToken,
  ) -> Result<FetchOutcome<Case>, ApiError>;

  /// All runs of a project.
  async fn runs(
    &self,
    project: &str,
    cancel: &CancellationToken,
  ) -> Result<FetchOutcome<Run>, ApiError>;

  /// Fetch a single run by its identifier.
  async fn run(&self, project: &str, run_id: u64) -> Result<Run, ApiError>;

  /// Create a run and return the created entity.
  async fn create_run(
    &self,
    project: &str,
    title: &str,
    description: &str,
  ) -> Result<Run, ApiError>;

  /// Whether the run has at least one result. A limit-1 probe; answers
  /// "empty or non-empty", not "how many".
  async fn run_has_results(&self, project: &str, run_id: u64) -> Result<bool, ApiError>;

  /// The set of case identifiers that already have a result in the run.
  async fn case_ids_in_run(
    &self,
    project: &str,
    run_id: u64,
    cancel: &CancellationToken,
  ) -> Result<HashSet<u64>, ApiError>;

  /// Bulk-create one chunk of results under a run.
  async fn post_results(
    &self,
    project: &str,
    run_id: u64,
    items: &[BulkItem],
  ) -> Result<(), ApiError>;
}
