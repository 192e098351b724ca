//! Serde types for the test-management API.

use serde::{Deserialize, Serialize};

/// The standard response envelope: `{ "status": bool, "result": ... }`.
///
/// A `status` of `false` on a 200 response is a logical service failure.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
  pub status: bool,
  pub result: T,
}

/// Paginated list payload inside an [`ApiResponse`].
#[derive(Debug, Deserialize)]
pub struct ListResult<T> {
  #[serde(default)]
  pub total: u64,
  #[serde(default = "Vec::new")]
  pub entities: Vec<T>,
}

/// One executed test result as reported by the source workspace.
///
/// Immutable once fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRecord {
  pub run_id: u64,
  pub case_id: u64,
  pub status: String,
  #[serde(default)]
  pub comment: Option<String>,
  /// Elapsed time in milliseconds.
  #[serde(default)]
  pub time_spent_ms: Option<u64>,
  /// Completion timestamp in the service's fixed-offset format.
  #[serde(default)]
  pub end_time: Option<String>,
}

/// A typed extension attribute attached to a case.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomFieldValue {
  pub id: u64,
  pub value: String,
}

/// A test-case definition.
#[derive(Debug, Clone, Deserialize)]
pub struct Case {
  pub id: u64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub custom_fields: Vec<CustomFieldValue>,
}

/// A run entity, addressed by a target-assigned identifier and a title.
#[derive(Debug, Clone, Deserialize)]
pub struct Run {
  pub id: u64,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
}

/// One transformed record ready for bulk posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItem {
  pub case_id: u64,
  pub status: String,
  /// Elapsed time in seconds, absent when zero.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub time: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
}

/// Request body for the bulk-create endpoint.
#[derive(Debug, Serialize)]
pub struct BulkRequest<'a> {
  pub results: &'a [BulkItem],
}

/// Per-item outcome flag returned by the bulk-create endpoint.
#[derive(Debug, Deserialize)]
pub struct BulkOutcome {
  #[serde(default)]
  pub id: u64,
  pub status: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bulk_item_omits_empty_fields() {
    let item = BulkItem {
      case_id: 105,
      status: "passed".to_string(),
      time: None,
      comment: None,
    };
    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json, serde_json::json!({"case_id": 105, "status": "passed"}));
  }

  #[test]
  fn parses_result_list_envelope() {
    let body = serde_json::json!({
      "status": true,
      "result": {
        "total": 1,
        "entities": [{
          "run_id": 10,
          "case_id": 5,
          "status": "failed",
          "comment": "boom",
          "time_spent_ms": 1500,
          "end_time": "2025-08-20T10:30:00+02:00"
        }]
      }
    });

    let parsed: ApiResponse<ListResult<SourceRecord>> = serde_json::from_value(body).unwrap();
    assert!(parsed.status);
    assert_eq!(parsed.result.entities.len(), 1);
    let record = &parsed.result.entities[0];
    assert_eq!(record.run_id, 10);
    assert_eq!(record.time_spent_ms, Some(1500));
  }

  #[test]
  fn tolerates_missing_optional_record_fields() {
    let body = serde_json::json!({"run_id": 10, "case_id": 5, "status": "passed"});
    let record: SourceRecord = serde_json::from_value(body).unwrap();
    assert!(record.comment.is_none());
    assert!(record.time_spent_ms.is_none());
    assert!(record.end_time.is_none());
  }
}
