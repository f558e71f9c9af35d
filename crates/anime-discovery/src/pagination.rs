//! Page metadata and incremental assembly of multi-page listings.

use crate::api::Pagination;
use crate::error::FetchError;
use serde::Serialize;

/// Paging state of one listing slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub has_next_page: bool,
    pub current_page: u32,
    pub total_pages: u32,
}

impl Default for PaginationMeta {
    fn default() -> Self {
        Self {
            has_next_page: false,
            current_page: 1,
            total_pages: 1,
        }
    }
}

impl PaginationMeta {
    /// Derive metadata from the envelope's pagination block
    ///
    /// `requested_page` fills in `current_page` when the block is present but
    /// does not echo it back. A block announcing a page past `u32::MAX` is
    /// malformed.
    pub fn from_envelope(
        block: Option<&Pagination>,
        requested_page: u32,
    ) -> Result<Self, FetchError> {
        let Some(block) = block else {
            return Ok(Self::default());
        };

        let current_page = block.current_page.unwrap_or(requested_page).max(1);
        let has_next_page = block.has_next_page.unwrap_or(false);
        let floor = if has_next_page {
            current_page.checked_add(1).ok_or_else(|| {
                FetchError::malformed(format!("next page after {} is out of range", current_page))
            })?
        } else {
            current_page
        };
        let total_pages = block.last_visible_page.unwrap_or(floor).max(floor);

        Ok(Self {
            has_next_page,
            current_page,
            total_pages,
        })
    }
}

/// Records of a listing slot plus its paging state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<R> {
    pub items: Vec<R>,
    pub pagination: PaginationMeta,
}

impl<R> Default for Listing<R> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            pagination: PaginationMeta::default(),
        }
    }
}

impl<R> Listing<R> {
    pub fn new(items: Vec<R>, pagination: PaginationMeta) -> Self {
        Self { items, pagination }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Merge page `page` onto what is already shown
///
/// Page 1 replaces everything; later pages are appended without
/// de-duplication. Missing existing state is treated like page 1. Paging
/// metadata always comes from the incoming page.
pub fn accumulate<R>(existing: Option<Listing<R>>, incoming: Listing<R>, page: u32) -> Listing<R> {
    match existing {
        Some(mut merged) if page > 1 => {
            merged.items.extend(incoming.items);
            merged.pagination = incoming.pagination;
            merged
        }
        _ => incoming,
    }
}
