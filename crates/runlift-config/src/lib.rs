//! Environment-driven configuration.
//!
//! Configuration errors are fatal and raised here, before any network
//! call is made. Everything downstream can assume a validated config.

mod error;

pub use error::ConfigError;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use runlift_mapping::MapMode;

const ENV_PREFIX: &str = "RUNLIFT_";

/// One workspace endpoint: base URL, credential, project code.
#[derive(Debug, Clone)]
pub struct Workspace {
  pub base_url: String,
  pub token: String,
  pub project: String,
}

/// Validated configuration for one migration invocation.
#[derive(Debug, Clone)]
pub struct Config {
  pub source: Workspace,
  pub target: Workspace,

  /// Only results completed after this instant are migrated.
  pub after: DateTime<Utc>,

  /// How source case ids are matched to target case ids.
  pub map_mode: MapMode,

  pub dry_run: bool,
  pub idempotent: bool,
  pub chunk_size: usize,
  pub concurrency: usize,
  /// Above this many run groups, idempotency probes are skipped.
  pub fast_mode_threshold: usize,
  /// Wall-clock limit for the whole batch.
  pub timeout: Duration,
  /// Optional source-status to target-status translation.
  pub status_map: Option<HashMap<String, String>>,
}

impl Config {
  /// Load configuration from process environment variables.
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// Load configuration through an arbitrary variable lookup.
  ///
  /// The indirection keeps config parsing testable without mutating
  /// process-global environment state.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let env = Env { lookup };

    let source = Workspace {
      base_url: env.required("SOURCE_API_BASE")?,
      token: env.required("SOURCE_TOKEN")?,
      project: env.required("SOURCE_PROJECT")?,
    };
    let target = Workspace {
      base_url: env
        .optional("TARGET_API_BASE")
        .unwrap_or_else(|| source.base_url.clone()),
      token: env.required("TARGET_TOKEN")?,
      project: env.required("TARGET_PROJECT")?,
    };

    let after_raw = env.required("AFTER")?;
    let after_secs: i64 = after_raw.parse().map_err(|_| ConfigError::InvalidVar {
      name: env.name("AFTER"),
      value: after_raw.clone(),
      reason: "must be a unix timestamp in seconds".to_string(),
    })?;
    let after = DateTime::from_timestamp(after_secs, 0).ok_or_else(|| ConfigError::InvalidVar {
      name: env.name("AFTER"),
      value: after_raw,
      reason: "timestamp out of range".to_string(),
    })?;

    let map_mode = Self::resolve_map_mode(&env, &source, &target)?;

    let status_map = match env.optional("STATUS_MAP") {
      Some(raw) => Some(parse_status_map(&env.name("STATUS_MAP"), &raw)?),
      None => None,
    };

    Ok(Self {
      source,
      target,
      after,
      map_mode,
      dry_run: env.bool_or("DRY_RUN", true)?,
      idempotent: env.bool_or("IDEMPOTENT", true)?,
      chunk_size: env.usize_or("CHUNK_SIZE", 200)?,
      concurrency: env.usize_or("CONCURRENCY", 2)?,
      fast_mode_threshold: env.usize_or("FAST_MODE_THRESHOLD", 20)?,
      timeout: Duration::from_secs(60 * env.usize_or("TIMEOUT_MINUTES", 30)? as u64),
      status_map,
    })
  }

  fn resolve_map_mode<F>(
    env: &Env<F>,
    source: &Workspace,
    target: &Workspace,
  ) -> Result<MapMode, ConfigError>
  where
    F: Fn(&str) -> Option<String>,
  {
    // same workspace: identifiers already agree, no lookup needed
    if source.base_url == target.base_url && source.project == target.project {
      return Ok(MapMode::Identity);
    }

    let mode = env
      .optional("MATCH_MODE")
      .unwrap_or_else(|| "annotation".to_string());
    match mode.as_str() {
      "annotation" => {
        let field_id = env.usize_or("FIELD_ID", 0)? as u64;
        if field_id == 0 {
          return Err(ConfigError::MissingVar {
            name: env.name("FIELD_ID"),
          });
        }
        Ok(MapMode::Annotation { field_id })
      }
      "table" => {
        let path = env.required("MAPPING_TABLE")?;
        Ok(MapMode::Table {
          path: PathBuf::from(path),
        })
      }
      other => Err(ConfigError::UnsupportedMode {
        mode: other.to_string(),
      }),
    }
  }
}

fn parse_status_map(name: &str, raw: &str) -> Result<HashMap<String, String>, ConfigError> {
  let mut map = HashMap::new();
  for pair in raw.split(',') {
    let Some((from, to)) = pair.split_once(':') else {
      return Err(ConfigError::InvalidVar {
        name: name.to_string(),
        value: raw.to_string(),
        reason: format!("invalid status pair '{}'", pair),
      });
    };
    map.insert(from.trim().to_string(), to.trim().to_string());
  }
  Ok(map)
}

struct Env<F> {
  lookup: F,
}

impl<F> Env<F>
where
  F: Fn(&str) -> Option<String>,
{
  fn name(&self, key: &str) -> String {
    format!("{}{}", ENV_PREFIX, key)
  }

  fn optional(&self, key: &str) -> Option<String> {
    (self.lookup)(&self.name(key)).filter(|v| !v.is_empty())
  }

  fn required(&self, key: &str) -> Result<String, ConfigError> {
    self.optional(key).ok_or_else(|| ConfigError::MissingVar {
      name: self.name(key),
    })
  }

  fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
    match self.optional(key) {
      None => Ok(default),
      Some(value) => match value.as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidVar {
          name: self.name(key),
          value,
          reason: "must be true or false".to_string(),
        }),
      },
    }
  }

  fn usize_or(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
    match self.optional(key) {
      None => Ok(default),
      Some(value) => value.parse().map_err(|_| ConfigError::InvalidVar {
        name: self.name(key),
        value,
        reason: "must be a non-negative integer".to_string(),
      }),
    }
  }
}
