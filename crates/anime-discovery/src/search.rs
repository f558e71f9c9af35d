//! Search box state: query text, debounced triggering and paged results.

use crate::api::source::fetch_listing;
use crate::api::{ApiRequest, Searchable, SharedSource};
use crate::coordinator::RequestCoordinator;
use crate::debounce::Debouncer;
use crate::pagination::{accumulate, Listing};
use crate::slot::{SlotKey, SlotState};
use shared::config::{SearchConfig, SearchMode};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Search settings
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub quiet_period: Duration,
    pub page_size: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::Auto,
            quiet_period: Duration::from_millis(500),
            page_size: 20,
        }
    }
}

impl SearchOptions {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            mode: config.mode,
            quiet_period: Duration::from_millis(config.debounce_ms),
            page_size: config.page_size,
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    /// Text currently in the search box
    query: String,
    /// Query whose results the slot holds or is loading
    submitted: Option<String>,
    has_searched: bool,
}

struct Inner<R> {
    source: SharedSource,
    coordinator: RequestCoordinator<Listing<R>>,
    session: Mutex<Session>,
    debouncer: Debouncer,
    options: SearchOptions,
}

/// Controller behind one search box
///
/// Cloning yields another handle to the same search.
pub struct SearchController<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for SearchController<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Searchable> SearchController<R> {
    pub fn new(source: SharedSource, options: SearchOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                coordinator: RequestCoordinator::new(),
                session: Mutex::new(Session::default()),
                debouncer: Debouncer::new(options.quiet_period),
                options,
            }),
        }
    }

    /// Record a change of the search box text
    ///
    /// In auto mode a search is scheduled after the quiet period, replacing
    /// any pending one; an empty query resets the results immediately without
    /// a request. In manual mode the text is only stored.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        self.session().query = text.clone();

        if self.inner.options.mode == SearchMode::Manual {
            return;
        }

        if text.trim().is_empty() {
            self.reset();
            return;
        }

        let controller = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(async move {
            if let Some(inner) = controller.upgrade() {
                SearchController { inner }.run_search(text);
            }
        });
    }

    /// Search for the current query now, dropping any pending debounced call
    pub fn search(&self) -> Option<JoinHandle<()>> {
        self.inner.debouncer.cancel();
        let query = self.session().query.clone();
        self.run_search(query)
    }

    /// Replace the query and search for it now
    pub fn search_for(&self, text: impl Into<String>) -> Option<JoinHandle<()>> {
        self.session().query = text.into();
        self.search()
    }

    /// Append the next page of the current results
    pub fn load_more(&self) -> Option<JoinHandle<()>> {
        let state = self.state();
        if state.loading || !state.data.pagination.has_next_page {
            return None;
        }
        let next_page = state.data.pagination.current_page.checked_add(1)?;
        let query = self.session().submitted.clone()?;
        Some(self.fetch_page(query, next_page))
    }

    /// Run the last submitted search again from page 1
    pub fn refetch(&self) -> Option<JoinHandle<()>> {
        let query = self.session().submitted.clone()?;
        Some(self.fetch_page(query, 1))
    }

    /// Drop results, error and the "has searched" flag; the query text stays
    pub fn clear_results(&self) {
        self.reset();
    }

    pub fn state(&self) -> SlotState<Listing<R>> {
        self.inner.coordinator.state(&SlotKey::SearchQuery)
    }

    pub fn query(&self) -> String {
        self.session().query.clone()
    }

    pub fn has_searched(&self) -> bool {
        self.session().has_searched
    }

    /// Whether a debounced search is waiting for the quiet period to end
    pub fn is_search_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    pub async fn settled(&self) -> SlotState<Listing<R>> {
        self.inner.coordinator.settled(&SlotKey::SearchQuery).await
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<u64> {
        self.inner.coordinator.subscribe()
    }

    fn run_search(&self, query: String) -> Option<JoinHandle<()>> {
        let query = query.trim().to_string();
        if query.is_empty() {
            self.reset();
            return None;
        }

        {
            let mut session = self.session();
            session.has_searched = true;
            session.submitted = Some(query.clone());
        }
        info!(query = %query, collection = R::COLLECTION, "Searching");
        Some(self.fetch_page(query, 1))
    }

    fn fetch_page(&self, query: String, page: u32) -> JoinHandle<()> {
        let request = ApiRequest::search(R::COLLECTION, &query, page, self.inner.options.page_size);
        debug!(query = %query, page, "Fetching search page");
        self.inner.coordinator.fetch_with(
            SlotKey::SearchQuery,
            fetch_listing::<R>(Arc::clone(&self.inner.source), request),
            move |existing, incoming| accumulate(existing, incoming, page),
        )
    }

    fn reset(&self) {
        self.inner.debouncer.cancel();
        self.inner.coordinator.clear(&SlotKey::SearchQuery);
        let mut session = self.session();
        session.has_searched = false;
        session.submitted = None;
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
