//! Per-run outcomes and the aggregated migration report.

use std::time::Duration;

use serde::Serialize;

/// Outcome of migrating one run group. Written once by the task that
/// produced it, aggregated only by the coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
  pub run_id: u64,
  /// Target run id, when one was resolved (absent in dry runs and on
  /// early failures).
  pub target_run_id: Option<u64>,
  pub success: bool,
  pub posted: usize,
  /// Records dropped for lack of a case mapping.
  pub skipped: usize,
  /// Items filtered out as already present in the target run.
  pub already_present: usize,
  pub error: Option<String>,
  #[serde(with = "duration_secs")]
  pub duration: Duration,
}

/// The final aggregate, written once per invocation.
#[derive(Debug, Serialize)]
pub struct MigrationReport {
  pub total_runs: usize,
  pub successful_runs: usize,
  pub failed_runs: usize,
  /// Run groups whose outcome never arrived before the batch timeout.
  pub lost_runs: usize,
  pub total_posted: usize,
  pub total_skipped: usize,
  pub dry_run: bool,
  pub timed_out: bool,
  /// True when any fetch hit its page ceiling; the source set may be
  /// incomplete.
  pub source_truncated: bool,
  #[serde(with = "duration_secs")]
  pub duration: Duration,
  pub outcomes: Vec<RunOutcome>,
}

mod duration_secs {
  use std::time::Duration;

  use serde::Serializer;

  pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn report_serializes_durations_as_seconds() {
    let report = MigrationReport {
      total_runs: 1,
      successful_runs: 1,
      failed_runs: 0,
      lost_runs: 0,
      total_posted: 2,
      total_skipped: 1,
      dry_run: true,
      timed_out: false,
      source_truncated: false,
      duration: Duration::from_millis(1500),
      outcomes: vec![],
    };

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["duration"], serde_json::json!(1.5));
    assert_eq!(json["dry_run"], serde_json::json!(true));
  }
}
