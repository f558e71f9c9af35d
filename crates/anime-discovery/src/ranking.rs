//! Session cache for the ranking page.
//!
//! Each category is its own slot. The default category is fetched when the
//! cache is built, the others on first selection; nothing is evicted while the
//! session lives, which is bounded by the fixed category set.

use crate::api::source::fetch_list;
use crate::api::{Anime, ApiRequest, SharedSource};
use crate::coordinator::RequestCoordinator;
use crate::slot::{SlotKey, SlotState};
use anyhow::anyhow;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Top-anime lists offered by the ranking page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankingCategory {
    Top,
    Airing,
    Upcoming,
    ByPopularity,
    Favorite,
}

impl RankingCategory {
    pub const ALL: [RankingCategory; 5] = [
        RankingCategory::Top,
        RankingCategory::Airing,
        RankingCategory::Upcoming,
        RankingCategory::ByPopularity,
        RankingCategory::Favorite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RankingCategory::Top => "top",
            RankingCategory::Airing => "airing",
            RankingCategory::Upcoming => "upcoming",
            RankingCategory::ByPopularity => "bypopularity",
            RankingCategory::Favorite => "favorite",
        }
    }

    /// Value of the `filter` query parameter, `None` for the overall ranking
    pub fn filter(&self) -> Option<&'static str> {
        match self {
            RankingCategory::Top => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for RankingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RankingCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| anyhow!("Invalid ranking category: {}", s))
    }
}

/// What re-selecting a category whose last fetch failed does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailedCategoryPolicy {
    /// Fetch again, unless a request is already in flight
    #[default]
    Retry,
    /// Keep showing the error until `refetch` is called
    KeepError,
}

/// Ranking cache settings
#[derive(Debug, Clone)]
pub struct RankingOptions {
    pub default_category: RankingCategory,
    pub limit: u32,
    pub failed_policy: FailedCategoryPolicy,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            default_category: RankingCategory::Top,
            limit: 10,
            failed_policy: FailedCategoryPolicy::Retry,
        }
    }
}

impl RankingOptions {
    /// Read the `[ranking]` section of the config file
    pub fn from_config(config: &shared::config::RankingConfig) -> anyhow::Result<Self> {
        Ok(Self {
            default_category: config.default_category.parse()?,
            limit: config.limit,
            failed_policy: if config.retry_failed {
                FailedCategoryPolicy::Retry
            } else {
                FailedCategoryPolicy::KeepError
            },
        })
    }
}

/// Per-category ranking state for one browsing session
pub struct RankingCache {
    source: SharedSource,
    coordinator: RequestCoordinator<Vec<Anime>>,
    active: Mutex<RankingCategory>,
    options: RankingOptions,
}

impl RankingCache {
    /// Build the cache and start fetching the default category
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(source: SharedSource, options: RankingOptions) -> Self {
        let cache = Self {
            source,
            coordinator: RequestCoordinator::new(),
            active: Mutex::new(options.default_category),
            options,
        };
        info!(category = %cache.options.default_category, "Ranking session started");
        cache.fetch_category(cache.options.default_category);
        cache
    }

    /// Make `category` active, fetching it only if nothing usable is cached
    ///
    /// Returns the handle of the request if one was issued.
    pub fn select(&self, category: RankingCategory) -> Option<JoinHandle<()>> {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = category;

        if self.needs_fetch(category) {
            Some(self.fetch_category(category))
        } else {
            debug!(category = %category, "Reusing cached ranking");
            None
        }
    }

    /// Fetch `category` again regardless of what is cached
    pub fn refetch(&self, category: RankingCategory) -> JoinHandle<()> {
        self.fetch_category(category)
    }

    pub fn state_of(&self, category: RankingCategory) -> SlotState<Vec<Anime>> {
        self.coordinator.state(&SlotKey::Ranking(category))
    }

    pub fn active(&self) -> RankingCategory {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn active_state(&self) -> SlotState<Vec<Anime>> {
        self.state_of(self.active())
    }

    /// Categories that have been requested during this session
    pub fn cached_categories(&self) -> Vec<RankingCategory> {
        RankingCategory::ALL
            .into_iter()
            .filter(|category| self.coordinator.contains(&SlotKey::Ranking(*category)))
            .collect()
    }

    pub async fn settled(&self, category: RankingCategory) -> SlotState<Vec<Anime>> {
        self.coordinator.settled(&SlotKey::Ranking(category)).await
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<u64> {
        self.coordinator.subscribe()
    }

    fn needs_fetch(&self, category: RankingCategory) -> bool {
        let key = SlotKey::Ranking(category);
        if !self.coordinator.contains(&key) {
            return true;
        }

        let state = self.coordinator.state(&key);
        !state.loading
            && state.is_failed()
            && self.options.failed_policy == FailedCategoryPolicy::Retry
    }

    fn fetch_category(&self, category: RankingCategory) -> JoinHandle<()> {
        let request = ApiRequest::top_anime(category.filter(), self.options.limit);
        debug!(category = %category, "Fetching ranking");
        self.coordinator.fetch(
            SlotKey::Ranking(category),
            fetch_list::<Anime>(Arc::clone(&self.source), request),
        )
    }
}
