//! Wire types and remote-service access for the migration pipeline.
//!
//! This crate owns three things:
//! - the serde types for the test-management API (cases, runs, results,
//!   bulk items, response envelopes),
//! - the paginated fetch loop used by every list endpoint,
//! - the [`TestService`] trait, the seam between the pipeline and the
//!   remote service. Production code uses [`HttpTestService`]; tests
//!   drive the pipeline with an in-memory implementation.

mod error;
mod fetch;
mod http;
mod service;
mod types;

pub use error::ApiError;
pub use fetch::{FetchOutcome, MAX_PAGES, PAGE_SIZE, fetch_paged};
pub use http::HttpTestService;
pub use service::TestService;
pub use types::{
  ApiResponse, BulkItem, BulkOutcome, BulkRequest, Case, CustomFieldValue, ListResult, Run,
  SourceRecord,
};
