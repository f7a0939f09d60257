//! Fetching every page of a model.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::backend::ContentBackend;
use crate::error::{FetchError, FetchResult};

/// Default number of pages in flight.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default page size.
pub const DEFAULT_PER_PAGE: usize = 100;

/// Fetch all items of a model and decode them into `T`.
///
/// The first page reveals the total count; the remaining pages are fetched
/// with at most `concurrency` requests in flight. Item order follows page
/// order. A record that does not decode fails the whole call.
pub async fn fetch_all_items<T: DeserializeOwned>(
    backend: &dyn ContentBackend,
    project: &str,
    model: &str,
    concurrency: usize,
    per_page: usize,
) -> FetchResult<Vec<T>> {
    let per_page = per_page.max(1);
    let first = backend.items_page(project, model, 1, per_page).await?;
    let pages = first.total_count.div_ceil(per_page);

    let rest: Vec<_> = stream::iter(2..=pages)
        .map(|page| backend.items_page(project, model, page, per_page))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    debug!(project, model, pages, total = first.total_count, "Fetched all pages");

    std::iter::once(first)
        .chain(rest)
        .flat_map(|page| page.items)
        .map(|item| {
            serde_json::from_value(item).map_err(|source| FetchError::Decode {
                model: model.to_string(),
                source,
            })
        })
        .collect()
}
