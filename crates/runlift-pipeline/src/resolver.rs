//! Idempotency resolution against the target workspace.
//!
//! Title is the de-duplication key for runs: repeated invocations derive
//! the same title and resolve to the same target run. Two accepted
//! limitations, kept deliberately rather than silently fixed:
//!
//! - two concurrent tasks creating the *same* title can race — each can
//!   miss the other's in-flight creation and a duplicate title appears.
//!   Sequential re-invocation is safe; concurrent same-title creation is
//!   not. Grouping by run id means this only bites when two source runs
//!   derive an identical title.
//! - already-posted filtering keys on case id alone. An existing result
//!   for a case satisfies idempotency even when its status, comment, or
//!   time differ; a changed result cannot be re-submitted in idempotent
//!   mode.

use runlift_api::{ApiError, BulkItem, Run, TestService};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Find the target run with this exact title, or create it.
///
/// A paginated scan of all target runs, first match wins; collisions on
/// title are treated as identity with no disambiguation by content.
/// O(existing runs) per call — a known scaling limitation.
pub async fn find_or_create_run(
  service: &dyn TestService,
  project: &str,
  title: &str,
  description: &str,
  cancel: &CancellationToken,
) -> Result<Run, ApiError> {
  let existing = service.runs(project, cancel).await?;
  if let Some(run) = existing.items.into_iter().find(|run| run.title == title) {
    info!(project, run_id = run.id, title, "reusing existing target run");
    return Ok(run);
  }

  service.create_run(project, title, description).await
}

/// Drop candidates whose target case already has a result in the run.
///
/// Returns the remaining items and the count filtered out. Skips the
/// existence probe entirely when the run has no results at all.
pub async fn filter_already_posted(
  service: &dyn TestService,
  project: &str,
  run_id: u64,
  items: Vec<BulkItem>,
  cancel: &CancellationToken,
) -> Result<(Vec<BulkItem>, usize), ApiError> {
  if !service.run_has_results(project, run_id).await? {
    return Ok((items, 0));
  }

  let existing = service.case_ids_in_run(project, run_id, cancel).await?;
  let before = items.len();
  let remaining: Vec<BulkItem> = items
    .into_iter()
    .filter(|item| !existing.contains(&item.case_id))
    .collect();
  let filtered = before - remaining.len();

  info!(
    project,
    run_id,
    fresh = remaining.len(),
    filtered,
    "filtered already-posted results"
  );
  Ok((remaining, filtered))
}
