//! Slot identity and the view model handed to the presentational layer.

use crate::api::MediaKind;
use crate::ranking::RankingCategory;
use serde::Serialize;
use std::fmt;

/// Sub-resource kinds reachable from a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailKind {
    Anime,
    Manga,
    Club,
    Reviews(MediaKind),
    Recommendations(MediaKind),
    Videos,
    Members,
}

/// One independent stream of fetch/result/error/loading state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SlotKey {
    SearchQuery,
    Ranking(RankingCategory),
    Listing,
    Detail { kind: DetailKind, id: u32 },
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::SearchQuery => write!(f, "search-query"),
            SlotKey::Ranking(category) => write!(f, "ranking:{}", category),
            SlotKey::Listing => write!(f, "listing-page"),
            SlotKey::Detail { kind, id } => match kind {
                DetailKind::Anime => write!(f, "anime:{}", id),
                DetailKind::Manga => write!(f, "manga:{}", id),
                DetailKind::Club => write!(f, "club:{}", id),
                DetailKind::Reviews(media) => write!(f, "{}-reviews:{}", media, id),
                DetailKind::Recommendations(media) => {
                    write!(f, "{}-recommendations:{}", media, id)
                }
                DetailKind::Videos => write!(f, "videos:{}", id),
                DetailKind::Members => write!(f, "members:{}", id),
            },
        }
    }
}

/// Where a slot is in its fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    Idle,
    Loading,
    Success,
    Failed,
}

/// Read-only `{data, loading, error}` view model of one slot
///
/// `loading` and `error` are never set together: starting a fetch clears the
/// previous error, and a failure ends loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    pub(crate) committed: bool,
}

impl<T: Default> Default for SlotState<T> {
    fn default() -> Self {
        Self {
            data: T::default(),
            loading: false,
            error: None,
            committed: false,
        }
    }
}

impl<T> SlotState<T> {
    pub fn phase(&self) -> SlotPhase {
        if self.loading {
            SlotPhase::Loading
        } else if self.error.is_some() {
            SlotPhase::Failed
        } else if self.committed {
            SlotPhase::Success
        } else {
            SlotPhase::Idle
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
