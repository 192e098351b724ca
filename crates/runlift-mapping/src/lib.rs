//! Case-identifier mapping between workspaces.
//!
//! A [`CaseMapping`] is a read-only lookup from source case id to target
//! case id, built once before the pipeline starts. Identifiers absent
//! from the mapping are "unmapped"; their records are dropped downstream
//! with a counted skip, never guessed.

mod build;
mod error;

pub use build::{MapMode, build};
pub use error::MappingError;

use std::collections::HashMap;
use std::path::Path;

/// Read-only lookup from source case id to target case id.
///
/// Keys are unique source identifiers; multiple sources may map to the
/// same target. Safe to share across concurrent tasks once built.
#[derive(Debug, Default, Clone)]
pub struct CaseMapping {
  entries: HashMap<u64, u64>,
}

impl CaseMapping {
  pub fn new(entries: HashMap<u64, u64>) -> Self {
    Self { entries }
  }

  /// Target case id for a source case id, if mapped.
  pub fn get(&self, source_id: u64) -> Option<u64> {
    self.entries.get(&source_id).copied()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// An empty mapping is not an error; it yields 100% skips downstream.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Write the mapping as a two-column CSV artifact, sorted by source id
  /// so repeated invocations produce identical files.
  pub fn write_artifact(&self, path: &Path) -> Result<(), MappingError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["source_case_id", "target_case_id"])?;

    let mut rows: Vec<(u64, u64)> = self.entries.iter().map(|(s, t)| (*s, *t)).collect();
    rows.sort_unstable();
    for (source_id, target_id) in rows {
      writer.write_record([source_id.to_string(), target_id.to_string()])?;
    }

    writer.flush()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lookup_hits_and_misses() {
    let mapping = CaseMapping::new(HashMap::from([(5, 105), (6, 106)]));
    assert_eq!(mapping.get(5), Some(105));
    assert_eq!(mapping.get(7), None);
    assert_eq!(mapping.len(), 2);
  }

  #[test]
  fn artifact_is_sorted_and_headed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("case_map.out.csv");

    let mapping = CaseMapping::new(HashMap::from([(9, 109), (1, 101), (5, 105)]));
    mapping.write_artifact(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
      lines,
      vec!["source_case_id,target_case_id", "1,101", "5,105", "9,109"]
    );
  }
}
