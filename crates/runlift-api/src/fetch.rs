//! Paginated fetch loop shared by every list endpoint.
//!
//! The service paginates with `limit`/`offset`; a page shorter than the
//! requested limit signals the end of the collection. A hard page-count
//! ceiling guards against servers that never report a short final page;
//! hitting it is surfaced as `truncated = true` rather than silently
//! dropped data.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ApiError;

/// Elements requested per page.
pub const PAGE_SIZE: usize = 100;

/// Hard ceiling on pages fetched in one call.
pub const MAX_PAGES: u32 = 1000;

/// The complete (or explicitly truncated) outcome of a paginated fetch.
#[derive(Debug)]
pub struct FetchOutcome<T> {
  pub items: Vec<T>,
  /// True when the page ceiling was hit before a short page was seen.
  pub truncated: bool,
  /// Number of pages actually fetched.
  pub pages: u32,
}

/// Fetch every page of a collection until a short page or the ceiling.
///
/// `fetch_page` is called with `(limit, offset)` and returns one page of
/// elements. Any page-level error aborts the whole fetch; no partial
/// result set is returned on failure. An optional delay is applied
/// between pages to stay clear of rate limits; both the delay and the
/// loop itself observe `cancel`.
pub async fn fetch_paged<T, F, Fut>(
  label: &str,
  cancel: &CancellationToken,
  page_delay: Option<Duration>,
  mut fetch_page: F,
) -> Result<FetchOutcome<T>, ApiError>
where
  F: FnMut(usize, usize) -> Fut,
  Fut: Future<Output = Result<Vec<T>, ApiError>>,
{
  let mut items = Vec::new();
  let mut offset = 0usize;
  let mut pages = 0u32;

  loop {
    if cancel.is_cancelled() {
      return Err(ApiError::Cancelled);
    }

    if pages >= MAX_PAGES {
      warn!(
        label,
        pages,
        total = items.len(),
        "page ceiling reached before a short page; result set is truncated"
      );
      return Ok(FetchOutcome {
        items,
        truncated: true,
        pages,
      });
    }

    let page = fetch_page(PAGE_SIZE, offset).await?;
    pages += 1;

    let batch = page.len();
    items.extend(page);

    info!(
      label,
      page = pages,
      offset,
      batch,
      total = items.len(),
      "fetched page"
    );

    if batch < PAGE_SIZE {
      return Ok(FetchOutcome {
        items,
        truncated: false,
        pages,
      });
    }

    offset += PAGE_SIZE;

    if let Some(delay) = page_delay {
      tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = cancel.cancelled() => return Err(ApiError::Cancelled),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn numbered_page(limit: usize, offset: usize, total: usize) -> Vec<usize> {
    (offset..total.min(offset + limit)).collect()
  }

  #[tokio::test]
  async fn stops_on_short_page() {
    let cancel = CancellationToken::new();
    let outcome = fetch_paged("test", &cancel, None, |limit, offset| async move {
      Ok(numbered_page(limit, offset, 250))
    })
    .await
    .unwrap();

    assert_eq!(outcome.items.len(), 250);
    assert_eq!(outcome.pages, 3);
    assert!(!outcome.truncated);
    assert_eq!(outcome.items, (0..250).collect::<Vec<_>>());
  }

  #[tokio::test]
  async fn empty_collection_is_one_empty_page() {
    let cancel = CancellationToken::new();
    let outcome = fetch_paged("test", &cancel, None, |_, _| async move {
      Ok(Vec::<usize>::new())
    })
    .await
    .unwrap();

    assert!(outcome.items.is_empty());
    assert_eq!(outcome.pages, 1);
    assert!(!outcome.truncated);
  }

  #[tokio::test]
  async fn full_final_page_surfaces_truncation() {
    // server always returns a full page; the ceiling must kick in
    let cancel = CancellationToken::new();
    let outcome = fetch_paged("test", &cancel, None, |limit, offset| async move {
      Ok(numbered_page(limit, offset, usize::MAX))
    })
    .await
    .unwrap();

    assert!(outcome.truncated);
    assert_eq!(outcome.pages, MAX_PAGES);
    assert_eq!(outcome.items.len(), MAX_PAGES as usize * PAGE_SIZE);
  }

  #[tokio::test]
  async fn page_error_aborts_the_whole_fetch() {
    let cancel = CancellationToken::new();
    let result = fetch_paged("test", &cancel, None, |limit, offset| async move {
      if offset >= 100 {
        Err(ApiError::Service {
          message: "boom".to_string(),
        })
      } else {
        Ok(numbered_page(limit, offset, 500))
      }
    })
    .await;

    assert!(matches!(result, Err(ApiError::Service { .. })));
  }

  #[tokio::test]
  async fn cancelled_token_stops_the_loop() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = fetch_paged("test", &cancel, None, |limit, offset| async move {
      Ok(numbered_page(limit, offset, 500))
    })
    .await;

    assert!(matches!(result, Err(ApiError::Cancelled)));
  }
}
