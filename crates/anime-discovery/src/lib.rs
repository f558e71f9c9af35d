//! Client-side request and state orchestration for the Jikan API v4.
//!
//! Every independent piece of remote data lives in a *slot* with a
//! `{data, loading, error}` view model. Controllers own slots and start
//! fetches; the [`RequestCoordinator`] makes sure only the most recently
//! started request of a slot ever becomes visible.

pub mod api;
pub mod coordinator;
pub mod debounce;
pub mod detail;
pub mod error;
pub mod listing;
pub mod pagination;
pub mod ranking;
pub mod search;
pub mod slot;
pub mod validation;

#[cfg(test)]
mod testing;

pub use api::{DataSource, JikanClient, SharedSource};
pub use coordinator::RequestCoordinator;
pub use debounce::Debouncer;
pub use detail::DetailSession;
pub use error::FetchError;
pub use listing::{ListingController, ListingFilter, SortOrder};
pub use pagination::{Listing, PaginationMeta};
pub use ranking::{FailedCategoryPolicy, RankingCache, RankingCategory, RankingOptions};
pub use search::{SearchController, SearchOptions};
pub use slot::{SlotKey, SlotPhase, SlotState};
pub use validation::{Record, RecordId};
