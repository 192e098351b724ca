//! Authenticated HTTP client for the test-management API.
//!
//! The client is an explicitly constructed value handed down to everything
//! that talks to a workspace; there is no global client state. One client
//! instance corresponds to one workspace (base URL + token).

mod client;
mod error;

pub use client::{Client, mask_token};
pub use error::ClientError;
