//! Grouping of a flat result set into per-run groups.

use std::collections::BTreeMap;

use chrono::DateTime;
use runlift_api::SourceRecord;

/// The completion timestamps carry a fixed numeric offset.
const END_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// All source records sharing one originating run, plus the derived
/// target-run title and description.
///
/// The title doubles as the idempotency key: repeated invocations must
/// derive the same title from the same input to rediscover the run.
#[derive(Debug, Clone)]
pub struct RunGroup {
  pub run_id: u64,
  pub title: String,
  pub description: String,
  pub records: Vec<SourceRecord>,
}

/// Partition records by run id, preserving multiplicity.
///
/// Groups come back ordered by run id so the coordinator's dispatch
/// order is deterministic.
pub fn group_by_run(records: Vec<SourceRecord>) -> Vec<RunGroup> {
  let mut by_run: BTreeMap<u64, Vec<SourceRecord>> = BTreeMap::new();
  for record in records {
    by_run.entry(record.run_id).or_default().push(record);
  }

  by_run
    .into_iter()
    .map(|(run_id, records)| {
      let title = derive_title(run_id, &records);
      let description = format!(
        "Migrated run with {} results from source workspace",
        records.len()
      );
      RunGroup {
        run_id,
        title,
        description,
        records,
      }
    })
    .collect()
}

/// Embed a human-readable completion date when the first record's
/// timestamp parses; fall back to the run id alone when it does not.
/// Cosmetic either way, but must be deterministic for identical input.
fn derive_title(run_id: u64, records: &[SourceRecord]) -> String {
  let parsed = records
    .first()
    .and_then(|r| r.end_time.as_deref())
    .and_then(|raw| DateTime::parse_from_str(raw, END_TIME_FORMAT).ok());

  match parsed {
    Some(end_time) => format!(
      "Migrated Run {} ({})",
      run_id,
      end_time.format("%Y-%m-%d %H:%M")
    ),
    None => format!("Migrated Run {}", run_id),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(run_id: u64, case_id: u64, end_time: Option<&str>) -> SourceRecord {
    serde_json::from_value(serde_json::json!({
      "run_id": run_id,
      "case_id": case_id,
      "status": "passed",
      "end_time": end_time,
    }))
    .unwrap()
  }

  #[test]
  fn groups_preserve_multiplicity_and_order_by_run_id() {
    let records = vec![
      record(11, 7, None),
      record(10, 5, None),
      record(10, 5, None),
      record(10, 6, None),
    ];

    let groups = group_by_run(records);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].run_id, 10);
    assert_eq!(groups[0].records.len(), 3);
    assert_eq!(groups[1].run_id, 11);
    assert_eq!(groups[1].records.len(), 1);
  }

  #[test]
  fn title_embeds_parsed_completion_date() {
    let groups = group_by_run(vec![record(10, 5, Some("2025-08-20T10:30:00+02:00"))]);
    assert_eq!(groups[0].title, "Migrated Run 10 (2025-08-20 10:30)");
    assert_eq!(
      groups[0].description,
      "Migrated run with 1 results from source workspace"
    );
  }

  #[test]
  fn title_falls_back_to_run_id_on_unparseable_timestamp() {
    let groups = group_by_run(vec![record(10, 5, Some("yesterday-ish"))]);
    assert_eq!(groups[0].title, "Migrated Run 10");

    let groups = group_by_run(vec![record(10, 5, None)]);
    assert_eq!(groups[0].title, "Migrated Run 10");
  }

  #[test]
  fn title_is_deterministic_for_identical_input() {
    let make = || group_by_run(vec![record(10, 5, Some("2025-08-20T10:30:00+02:00"))]);
    assert_eq!(make()[0].title, make()[0].title);
  }

  #[test]
  fn empty_input_yields_no_groups() {
    assert!(group_by_run(Vec::new()).is_empty());
  }
}
