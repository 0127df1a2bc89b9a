//! Page slicing shared by every list-shaped read path.
//!
//! Pages are 1-indexed. Out-of-range pages are rejected, never clamped;
//! the one exception is the empty result set, which reports page 1 of 1
//! with zero items so callers need not special-case emptiness.

use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// Default page size for inbox listings.
pub const PAGE_SIZE_INBOX: i64 = 10;
/// Default page size for thread member listings.
pub const PAGE_SIZE_THREAD: i64 = 20;
/// Default page size for audit listings.
pub const PAGE_SIZE_AUDIT: i64 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of results plus the page bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageInfo,
}

/// Slice `items` into the requested page.
///
/// `page < 1` and `per_page < 1` fail with [`StoreError::InvalidPage`];
/// a page beyond the total for a non-empty set fails with
/// [`StoreError::PageOutOfRange`].
pub fn paginate<T: Clone>(items: &[T], page: i64, per_page: i64) -> StoreResult<Paginated<T>> {
    if page < 1 {
        return Err(StoreError::InvalidPage(page));
    }
    if per_page < 1 {
        return Err(StoreError::InvalidPage(per_page));
    }

    let total_items = items.len() as i64;
    if total_items == 0 {
        return Ok(Paginated {
            data: Vec::new(),
            pagination: PageInfo {
                page: 1,
                per_page,
                total_items: 0,
                total_pages: 1,
                has_next: false,
                has_prev: false,
            },
        });
    }

    let total_pages = (total_items + per_page - 1) / per_page;
    if page > total_pages {
        return Err(StoreError::PageOutOfRange { page, total_pages });
    }

    let start = ((page - 1) * per_page) as usize;
    let end = (start + per_page as usize).min(items.len());

    Ok(Paginated {
        data: items[start..end].to_vec(),
        pagination: PageInfo {
            page,
            per_page,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        },
    })
}
