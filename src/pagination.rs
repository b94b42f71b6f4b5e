//! Offset/limit pagination over provider list endpoints.

use std::future::Future;

use crate::spotify::Page;

/// Fetch every item of a paginated collection.
///
/// Pages are requested one after another at offsets `0, limit, 2 * limit, ...`
/// until the offset reaches the `total` reported by the first page. Any page
/// error aborts the whole fetch.
pub async fn fetch_all<T, E, F, Fut>(limit: u32, mut fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let limit = limit.max(1);

    let first = fetch_page(0, limit).await?;
    let total = first.total;
    // sized by received items, never by the reported `total`
    let mut items = first.items;

    let mut offset = limit;
    while offset < total {
        let page = fetch_page(offset, limit).await?;
        items.extend(page.items);
        offset = offset.saturating_add(limit);
    }

    tracing::debug!(total, fetched = items.len(), "pagination complete");
    Ok(items)
}
