//! Deterministic transformation of source records into bulk items.

use std::collections::HashMap;

use runlift_api::{BulkItem, SourceRecord};
use runlift_mapping::CaseMapping;
use tracing::warn;

/// Maximum elapsed time the target service accepts: one year in seconds.
pub const MAX_TIME_SECONDS: u64 = 31_536_000;

/// Map records to bulk items; records whose case id is not in the
/// mapping are dropped and counted, never guessed.
///
/// Elapsed time is converted from milliseconds to whole seconds; a zero
/// result is omitted, and values beyond [`MAX_TIME_SECONDS`] are clamped
/// with a warning rather than rejected.
pub fn transform(
  records: &[SourceRecord],
  mapping: &CaseMapping,
  status_map: Option<&HashMap<String, String>>,
) -> (Vec<BulkItem>, usize) {
  let mut items = Vec::with_capacity(records.len());
  let mut skipped = 0usize;

  for record in records {
    let Some(target_case_id) = mapping.get(record.case_id) else {
      skipped += 1;
      continue;
    };

    let status = match status_map.and_then(|map| map.get(&record.status)) {
      Some(mapped) => mapped.clone(),
      None => record.status.clone(),
    };

    items.push(BulkItem {
      case_id: target_case_id,
      status,
      time: clamp_time(record.case_id, record.time_spent_ms),
      comment: record.comment.clone(),
    });
  }

  (items, skipped)
}

fn clamp_time(case_id: u64, time_spent_ms: Option<u64>) -> Option<u64> {
  let seconds = time_spent_ms? / 1000;
  if seconds == 0 {
    return None;
  }
  if seconds > MAX_TIME_SECONDS {
    warn!(
      case_id,
      seconds,
      max = MAX_TIME_SECONDS,
      "capping elapsed time to the maximum the service accepts"
    );
    return Some(MAX_TIME_SECONDS);
  }
  Some(seconds)
}
