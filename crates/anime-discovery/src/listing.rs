//! Filtered, paginated browsing of a collection.

use crate::api::source::fetch_listing;
use crate::api::{ApiRequest, Searchable, SharedSource};
use crate::coordinator::RequestCoordinator;
use crate::pagination::{accumulate, Listing};
use crate::slot::{SlotKey, SlotState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filters applied to a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    pub query: String,
    /// Genre ids, sent comma separated
    pub genres: Vec<u32>,
    /// `tv`, `movie`, `manga`, `novel`, ...
    pub media_type: Option<String>,
    pub order_by: Option<String>,
    pub sort: Option<SortOrder>,
}

impl ListingFilter {
    /// Request for one page of `collection` under this filter
    pub fn request(&self, collection: &str, page: u32, limit: u32) -> ApiRequest {
        let query = self.query.trim();
        let genres = self
            .genres
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");

        ApiRequest::new(collection)
            .param_opt("q", (!query.is_empty()).then_some(query))
            .param_opt("genres", (!genres.is_empty()).then_some(genres))
            .param_opt("type", self.media_type.as_deref())
            .param_opt("order_by", self.order_by.as_deref())
            .param_opt("sort", self.sort.map(|s| s.as_str()))
            .param("page", page)
            .param("limit", limit)
    }
}

#[derive(Debug, Clone, Copy)]
enum PageMerge {
    Replace,
    Append,
}

#[derive(Debug)]
struct View {
    filter: ListingFilter,
    page: u32,
}

struct Inner<R> {
    source: SharedSource,
    coordinator: RequestCoordinator<Listing<R>>,
    view: Mutex<View>,
    page_size: u32,
}

/// Controller behind a browse page
///
/// Filter changes restart at page 1. Page navigation replaces the shown
/// results while [`load_more`](Self::load_more) appends to them.
pub struct ListingController<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for ListingController<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Searchable> ListingController<R> {
    /// Create an idle controller; nothing is fetched until the first
    /// filter change, navigation or [`refetch`](Self::refetch)
    pub fn new(source: SharedSource, filter: ListingFilter, page_size: u32) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                coordinator: RequestCoordinator::new(),
                view: Mutex::new(View { filter, page: 1 }),
                page_size,
            }),
        }
    }

    pub fn set_query(&self, query: impl Into<String>) -> JoinHandle<()> {
        let query = query.into();
        self.update_filter(|filter| filter.query = query)
    }

    pub fn set_genres(&self, genres: Vec<u32>) -> JoinHandle<()> {
        self.update_filter(|filter| filter.genres = genres)
    }

    pub fn set_media_type(&self, media_type: Option<String>) -> JoinHandle<()> {
        self.update_filter(|filter| filter.media_type = media_type)
    }

    pub fn set_order(&self, order_by: Option<String>, sort: Option<SortOrder>) -> JoinHandle<()> {
        self.update_filter(|filter| {
            filter.order_by = order_by;
            filter.sort = sort;
        })
    }

    /// Show page `page`; pages are 1-based
    pub fn go_to_page(&self, page: u32) -> Option<JoinHandle<()>> {
        if page == 0 {
            return None;
        }
        Some(self.fetch_page(page, PageMerge::Replace))
    }

    pub fn go_to_next_page(&self) -> Option<JoinHandle<()>> {
        if !self.state().data.pagination.has_next_page {
            return None;
        }
        self.go_to_page(self.current_page().checked_add(1)?)
    }

    pub fn go_to_prev_page(&self) -> Option<JoinHandle<()>> {
        let page = self.current_page();
        if page <= 1 {
            return None;
        }
        self.go_to_page(page - 1)
    }

    /// Append the next page to the shown results
    pub fn load_more(&self) -> Option<JoinHandle<()>> {
        let state = self.state();
        if state.loading || !state.data.pagination.has_next_page {
            return None;
        }
        let next_page = self.current_page().checked_add(1)?;
        Some(self.fetch_page(next_page, PageMerge::Append))
    }

    /// Reload the current page
    pub fn refetch(&self) -> JoinHandle<()> {
        self.fetch_page(self.current_page(), PageMerge::Replace)
    }

    /// Drop results and error and go back to page 1; filters stay
    pub fn clear_results(&self) {
        self.view().page = 1;
        self.inner.coordinator.clear(&SlotKey::Listing);
    }

    pub fn state(&self) -> SlotState<Listing<R>> {
        self.inner.coordinator.state(&SlotKey::Listing)
    }

    /// Last page requested
    pub fn current_page(&self) -> u32 {
        self.view().page
    }

    pub fn filter(&self) -> ListingFilter {
        self.view().filter.clone()
    }

    pub async fn settled(&self) -> SlotState<Listing<R>> {
        self.inner.coordinator.settled(&SlotKey::Listing).await
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<u64> {
        self.inner.coordinator.subscribe()
    }

    fn update_filter(&self, change: impl FnOnce(&mut ListingFilter)) -> JoinHandle<()> {
        {
            let mut view = self.view();
            change(&mut view.filter);
            info!(collection = R::COLLECTION, filter = ?view.filter, "Listing filter changed");
        }
        self.fetch_page(1, PageMerge::Replace)
    }

    fn fetch_page(&self, page: u32, merge: PageMerge) -> JoinHandle<()> {
        let request = {
            let mut view = self.view();
            view.page = page;
            view.filter.request(R::COLLECTION, page, self.inner.page_size)
        };
        debug!(request = %request, ?merge, "Fetching listing page");

        self.inner.coordinator.fetch_with(
            SlotKey::Listing,
            fetch_listing::<R>(Arc::clone(&self.inner.source), request),
            move |existing, incoming| match merge {
                PageMerge::Append => accumulate(existing, incoming, page),
                PageMerge::Replace => incoming,
            },
        )
    }

    fn view(&self) -> MutexGuard<'_, View> {
        self.inner.view.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
