//! Mapping construction for the three match modes.

use std::collections::HashMap;
use std::path::PathBuf;

use runlift_api::Case;
use tracing::{info, warn};

use crate::{CaseMapping, MappingError};

/// How source case ids are matched to target case ids.
///
/// Mode-parameter validation (a zero field id, a missing table path)
/// happens at configuration load, before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapMode {
  /// Scan target cases for an extension field carrying the originating
  /// source case id.
  Annotation { field_id: u64 },
  /// Read an explicit two-column (source id, target id) CSV table.
  Table { path: PathBuf },
  /// Source and target workspace are the same; every known source case
  /// id maps to itself.
  Identity,
}

/// Build the case mapping for the selected mode.
pub fn build(
  mode: &MapMode,
  source_cases: &[Case],
  target_cases: &[Case],
) -> Result<CaseMapping, MappingError> {
  let mapping = match mode {
    MapMode::Annotation { field_id } => build_annotation(target_cases, *field_id),
    MapMode::Table { path } => build_table(path)?,
    MapMode::Identity => build_identity(source_cases),
  };

  info!(entries = mapping.len(), mode = ?mode, "built case mapping");
  Ok(mapping)
}

fn build_annotation(target_cases: &[Case], field_id: u64) -> CaseMapping {
  let mut entries = HashMap::new();

  for case in target_cases {
    for field in &case.custom_fields {
      if field.id != field_id {
        continue;
      }
      match field.value.trim().parse::<u64>() {
        // last case with a matching field wins on duplicates
        Ok(source_id) => {
          entries.insert(source_id, case.id);
        }
        Err(_) => {
          warn!(
            case_id = case.id,
            value = %field.value,
            "skipping case with non-integer annotation value"
          );
        }
      }
      break;
    }
  }

  CaseMapping::new(entries)
}

fn build_table(path: &PathBuf) -> Result<CaseMapping, MappingError> {
  // the first row is always treated as a header and discarded
  let mut reader = csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .from_path(path)?;

  let mut entries = HashMap::new();
  for (index, record) in reader.records().enumerate() {
    let row = index + 2; // 1-based, after the header
    let record = record?;

    let source = record.get(0).map(str::trim).and_then(|v| v.parse::<u64>().ok());
    let target = record.get(1).map(str::trim).and_then(|v| v.parse::<u64>().ok());

    match (source, target) {
      (Some(source_id), Some(target_id)) => {
        entries.insert(source_id, target_id);
      }
      _ => {
        warn!(row, "skipping malformed mapping table row");
      }
    }
  }

  Ok(CaseMapping::new(entries))
}

fn build_identity(source_cases: &[Case]) -> CaseMapping {
  let entries = source_cases.iter().map(|case| (case.id, case.id)).collect();
  CaseMapping::new(entries)
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  fn case(id: u64, fields: Vec<(u64, &str)>) -> Case {
    let body = serde_json::json!({
      "id": id,
      "title": format!("case {}", id),
      "custom_fields": fields
        .into_iter()
        .map(|(fid, value)| serde_json::json!({"id": fid, "value": value}))
        .collect::<Vec<_>>(),
    });
    serde_json::from_value(body).unwrap()
  }

  #[test]
  fn annotation_mode_maps_parsed_field_values() {
    let targets = vec![
      case(105, vec![(7, "5")]),
      case(106, vec![(7, "6"), (9, "ignored")]),
      case(107, vec![(9, "not the field")]),
    ];

    let mapping = build(&MapMode::Annotation { field_id: 7 }, &[], &targets).unwrap();
    assert_eq!(mapping.get(5), Some(105));
    assert_eq!(mapping.get(6), Some(106));
    assert_eq!(mapping.len(), 2);
  }

  #[test]
  fn annotation_mode_skips_unparseable_values_and_lets_the_last_case_win() {
    let targets = vec![
      case(105, vec![(7, "5")]),
      case(205, vec![(7, "5")]),
      case(300, vec![(7, "garbage")]),
    ];

    let mapping = build(&MapMode::Annotation { field_id: 7 }, &[], &targets).unwrap();
    assert_eq!(mapping.get(5), Some(205));
    assert_eq!(mapping.len(), 1);
  }

  #[test]
  fn empty_annotation_mapping_is_not_an_error() {
    let mapping = build(&MapMode::Annotation { field_id: 7 }, &[], &[]).unwrap();
    assert!(mapping.is_empty());
  }

  #[test]
  fn table_mode_discards_header_and_malformed_rows() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source_case_id,target_case_id").unwrap();
    writeln!(file, "5,105").unwrap();
    writeln!(file, "six,106").unwrap();
    writeln!(file, "7").unwrap();
    writeln!(file, " 8 , 108 ").unwrap();
    file.flush().unwrap();

    let mode = MapMode::Table {
      path: file.path().to_path_buf(),
    };
    let mapping = build(&mode, &[], &[]).unwrap();

    assert_eq!(mapping.get(5), Some(105));
    assert_eq!(mapping.get(8), Some(108));
    assert_eq!(mapping.len(), 2);
  }

  #[test]
  fn table_mode_fails_on_missing_file() {
    let mode = MapMode::Table {
      path: PathBuf::from("/nonexistent/mapping.csv"),
    };
    assert!(build(&mode, &[], &[]).is_err());
  }

  #[test]
  fn identity_mode_maps_every_source_case_to_itself() {
    let sources = vec![case(5, vec![]), case(6, vec![])];
    let mapping = build(&MapMode::Identity, &sources, &[]).unwrap();
    assert_eq!(mapping.get(5), Some(5));
    assert_eq!(mapping.get(6), Some(6));
  }
}
