//! The migration pipeline.
//!
//! Fetched source results are grouped by originating run, translated to
//! target case identifiers, and replayed into the target workspace. The
//! [`Coordinator`] dispatches one task per run group under a bounded
//! concurrency limit; each task resolves its target run idempotently,
//! transforms its records, and posts them in chunks with backoff.
//!
//! The pipeline converges rather than transacts: repeated invocations
//! with `idempotent = true` find the same target runs by title and skip
//! results whose case already has one there. See the module docs of
//! [`resolver`] for the accepted approximations.

pub mod coordinator;
pub mod group;
pub mod poster;
pub mod report;
pub mod resolver;
pub mod transform;

mod error;

pub use coordinator::{Coordinator, PipelineOptions};
pub use error::PipelineError;
pub use group::{RunGroup, group_by_run};
pub use report::{MigrationReport, RunOutcome};
pub use transform::{MAX_TIME_SECONDS, transform};
