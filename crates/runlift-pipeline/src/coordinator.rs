//! Bounded-concurrency orchestration of run-group migrations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use runlift_api::TestService;
use runlift_mapping::CaseMapping;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::PipelineError;
use crate::group::RunGroup;
use crate::poster::post_bulk;
use crate::report::{MigrationReport, RunOutcome};
use crate::resolver::{filter_already_posted, find_or_create_run};
use crate::transform::transform;

/// Behavior switches for one migration batch.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
  /// Maximum run-group migrations in flight at once.
  pub concurrency: usize,
  /// Wall-clock limit for the whole batch.
  pub timeout: Duration,
  /// Perform all read and decision logic but issue no writes.
  pub dry_run: bool,
  /// Converge on existing target runs instead of always creating new ones.
  pub idempotent: bool,
  /// Above this many run groups, skip the per-run result probes and
  /// re-post everything (run deduplication only).
  pub fast_mode_threshold: usize,
  pub chunk_size: usize,
  pub status_map: Option<HashMap<String, String>>,
}

impl Default for PipelineOptions {
  fn default() -> Self {
    Self {
      concurrency: 2,
      timeout: Duration::from_secs(30 * 60),
      dry_run: true,
      idempotent: true,
      fast_mode_threshold: 20,
      chunk_size: 200,
      status_map: None,
    }
  }
}

/// Dispatches one task per run group under a counting semaphore,
/// collects one outcome per group, and enforces the batch timeout.
///
/// The case mapping and the service handle are shared read-only across
/// tasks; all counters are aggregated by the single collector loop.
pub struct Coordinator {
  service: Arc<dyn TestService>,
  target_project: String,
  options: PipelineOptions,
}

impl Coordinator {
  pub fn new(
    service: Arc<dyn TestService>,
    target_project: impl Into<String>,
    options: PipelineOptions,
  ) -> Self {
    Self {
      service,
      target_project: target_project.into(),
      options,
    }
  }

  /// Migrate every run group and aggregate the outcomes.
  ///
  /// A failing group never aborts its siblings. On batch timeout the
  /// collector stops waiting and cancels `cancel`; outcomes that never
  /// arrived are counted as lost in the report.
  pub async fn migrate(
    &self,
    groups: Vec<RunGroup>,
    mapping: Arc<CaseMapping>,
    cancel: CancellationToken,
  ) -> MigrationReport {
    let start = Instant::now();
    let total = groups.len();
    let fast_mode = self.options.idempotent && total > self.options.fast_mode_threshold;

    if fast_mode {
      warn!(
        total,
        threshold = self.options.fast_mode_threshold,
        "large batch: skipping per-run result probes (run deduplication only)"
      );
    }

    info!(
      total,
      concurrency = self.options.concurrency,
      dry_run = self.options.dry_run,
      idempotent = self.options.idempotent,
      "dispatching run-group migrations"
    );

    let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
    let (tx, mut rx) = mpsc::channel::<RunOutcome>(total.max(1));

    for group in groups {
      let service = Arc::clone(&self.service);
      let mapping = Arc::clone(&mapping);
      let semaphore = Arc::clone(&semaphore);
      let cancel = cancel.clone();
      let tx = tx.clone();
      let options = self.options.clone();
      let project = self.target_project.clone();

      tokio::spawn(async move {
        let run_id = group.run_id;
        let started = Instant::now();

        let permit = tokio::select! {
          permit = Arc::clone(&semaphore).acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return,
          },
          _ = cancel.cancelled() => {
            let _ = tx
              .send(failure_outcome(run_id, started, &PipelineError::Cancelled))
              .await;
            return;
          }
        };

        let outcome =
          match migrate_group(service.as_ref(), &project, group, &mapping, &options, fast_mode, &cancel)
            .await
          {
            Ok(outcome) => outcome,
            Err(err) => {
              error!(run_id, error = %err, "run-group migration failed");
              failure_outcome(run_id, started, &err)
            }
          };

        drop(permit);
        let _ = tx.send(outcome).await;
      });
    }
    drop(tx);

    self.collect(total, &mut rx, &cancel, start).await
  }

  async fn collect(
    &self,
    total: usize,
    rx: &mut mpsc::Receiver<RunOutcome>,
    cancel: &CancellationToken,
    start: Instant,
  ) -> MigrationReport {
    let deadline = tokio::time::Instant::now() + self.options.timeout;

    let mut outcomes: Vec<RunOutcome> = Vec::with_capacity(total);
    let mut timed_out = false;

    while outcomes.len() < total {
      tokio::select! {
        received = rx.recv() => match received {
          Some(outcome) => {
            info!(
              run_id = outcome.run_id,
              success = outcome.success,
              completed = outcomes.len() + 1,
              total,
              "run-group completed"
            );
            outcomes.push(outcome);
          }
          None => break,
        },
        _ = tokio::time::sleep_until(deadline) => {
          timed_out = true;
          warn!(
            completed = outcomes.len(),
            total,
            "batch timeout reached; cancelling in-flight run groups"
          );
          cancel.cancel();
          break;
        }
      }
    }

    let successful_runs = outcomes.iter().filter(|o| o.success).count();
    let failed_runs = outcomes.len() - successful_runs;
    let total_posted = outcomes.iter().filter(|o| o.success).map(|o| o.posted).sum();
    let total_skipped = outcomes.iter().filter(|o| o.success).map(|o| o.skipped).sum();

    MigrationReport {
      total_runs: total,
      successful_runs,
      failed_runs,
      lost_runs: total - outcomes.len(),
      total_posted,
      total_skipped,
      dry_run: self.options.dry_run,
      timed_out,
      source_truncated: false,
      duration: start.elapsed(),
      outcomes,
    }
  }
}

/// Migrate one run group: transform, resolve the target run, filter
/// already-posted items, post the rest.
async fn migrate_group(
  service: &dyn TestService,
  project: &str,
  group: RunGroup,
  mapping: &CaseMapping,
  options: &PipelineOptions,
  fast_mode: bool,
  cancel: &CancellationToken,
) -> Result<RunOutcome, PipelineError> {
  let started = Instant::now();
  let run_id = group.run_id;

  let (mut items, skipped) = transform(&group.records, mapping, options.status_map.as_ref());
  info!(
    run_id,
    prepared = items.len(),
    skipped,
    title = %group.title,
    "transformed run group"
  );

  if options.dry_run {
    info!(
      run_id,
      title = %group.title,
      items = items.len(),
      "dry run: would create run and post results"
    );
    return Ok(RunOutcome {
      run_id,
      target_run_id: None,
      success: true,
      posted: items.len(),
      skipped,
      already_present: 0,
      error: None,
      duration: started.elapsed(),
    });
  }

  let mut already_present = 0usize;
  let target_run = if options.idempotent {
    let run = find_or_create_run(service, project, &group.title, &group.description, cancel).await?;
    if !fast_mode {
      let (remaining, filtered) =
        filter_already_posted(service, project, run.id, items, cancel).await?;
      items = remaining;
      already_present = filtered;
    }
    run
  } else {
    service
      .create_run(project, &group.title, &group.description)
      .await?
  };

  if items.is_empty() {
    info!(
      run_id,
      target_run_id = target_run.id,
      "no new results to post"
    );
    return Ok(RunOutcome {
      run_id,
      target_run_id: Some(target_run.id),
      success: true,
      posted: 0,
      skipped,
      already_present,
      error: None,
      duration: started.elapsed(),
    });
  }

  post_bulk(service, project, target_run.id, &items, options.chunk_size, cancel).await?;

  info!(
    run_id,
    target_run_id = target_run.id,
    posted = items.len(),
    "run group migrated"
  );
  Ok(RunOutcome {
    run_id,
    target_run_id: Some(target_run.id),
    success: true,
    posted: items.len(),
    skipped,
    already_present,
    error: None,
    duration: started.elapsed(),
  })
}

fn failure_outcome(run_id: u64, started: Instant, err: &PipelineError) -> RunOutcome {
  RunOutcome {
    run_id,
    target_run_id: None,
    success: false,
    posted: 0,
    skipped: 0,
    already_present: 0,
    error: Some(err.to_string()),
    duration: started.elapsed(),
  }
}
