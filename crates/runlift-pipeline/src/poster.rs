//! Chunked bulk posting with bounded backoff.

use std::time::Duration;

use runlift_api::{ApiError, BulkItem, TestService};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::PipelineError;

/// Fixed backoff schedule for retryable chunk failures. One attempt per
/// entry; exhausting it is a terminal failure for the chunk.
const BACKOFF: [Duration; 4] = [
  Duration::from_millis(200),
  Duration::from_secs(1),
  Duration::from_secs(3),
  Duration::from_secs(5),
];

/// Post items to a run in fixed-size chunks, sequentially.
///
/// Chunks within a run never run in parallel; the target's per-run
/// ordering expectations hold. Each chunk gets the full backoff schedule
/// independently, but a terminally failed chunk aborts the chunks after
/// it — no partial-chunk continuation.
pub async fn post_bulk(
  service: &dyn TestService,
  project: &str,
  run_id: u64,
  items: &[BulkItem],
  chunk_size: usize,
  cancel: &CancellationToken,
) -> Result<(), PipelineError> {
  if items.is_empty() {
    return Ok(());
  }

  let chunk_size = if chunk_size == 0 { 200 } else { chunk_size };
  let total_chunks = items.len().div_ceil(chunk_size);

  for (index, chunk) in items.chunks(chunk_size).enumerate() {
    let chunk_no = index + 1;

    if cancel.is_cancelled() {
      return Err(PipelineError::Cancelled);
    }

    info!(
      project,
      run_id,
      chunk = chunk_no,
      total_chunks,
      items = chunk.len(),
      "posting chunk"
    );
    post_chunk(service, project, run_id, chunk, chunk_no, total_chunks, cancel).await?;
  }

  info!(project, run_id, total_chunks, "all chunks posted");
  Ok(())
}

async fn post_chunk(
  service: &dyn TestService,
  project: &str,
  run_id: u64,
  chunk: &[BulkItem],
  chunk_no: usize,
  total_chunks: usize,
  cancel: &CancellationToken,
) -> Result<(), PipelineError> {
  let mut last_error = None;

  for (attempt, delay) in BACKOFF.iter().enumerate() {
    match service.post_results(project, run_id, chunk).await {
      Ok(()) => return Ok(()),
      Err(err) if err.is_retryable() => {
        if attempt + 1 < BACKOFF.len() {
          warn!(
            project,
            run_id,
            chunk = chunk_no,
            total_chunks,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retryable chunk failure, backing off"
          );
          tokio::select! {
            _ = tokio::time::sleep(*delay) => {}
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
          }
        }
        last_error = Some(err);
      }
      Err(err) => return Err(PipelineError::Api(err)),
    }
  }

  Err(PipelineError::ChunkExhausted {
    chunk: chunk_no,
    total: total_chunks,
    attempts: BACKOFF.len(),
    // exhausted only after at least one retryable failure
    source: last_error.unwrap_or(ApiError::Cancelled),
  })
}
