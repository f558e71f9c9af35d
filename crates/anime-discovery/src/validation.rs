//! Record-level validation of API payloads.
//!
//! A batch is only rejected as a whole when it is not a sequence at all;
//! individual incomplete records are dropped and the rest are kept in order.

use crate::error::FetchError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Stable identity of a record, used as the list key by the view
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    /// Numeric MyAnimeList id
    Mal(u32),
    /// String identity (usernames, YouTube ids)
    Name(String),
}

impl RecordId {
    pub fn is_present(&self) -> bool {
        match self {
            RecordId::Mal(id) => *id > 0,
            RecordId::Name(name) => !name.trim().is_empty(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Mal(id) => write!(f, "{}", id),
            RecordId::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A domain entity that can be shown by the presentational layer
pub trait Record: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Records shown as image cards must carry a usable picture
    const GRID: bool = true;

    fn id(&self) -> RecordId;

    /// Title or username
    fn display_name(&self) -> &str;

    fn image_url(&self) -> Option<&str>;

    fn is_valid(&self) -> bool {
        if !self.id().is_present() || self.display_name().trim().is_empty() {
            return false;
        }
        !Self::GRID || self.image_url().is_some_and(is_resolvable_url)
    }
}

fn is_resolvable_url(url: &str) -> bool {
    reqwest::Url::parse(url.trim())
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Keep the structurally complete records of a list payload
pub fn validate<R: Record>(raw: &Value) -> Result<Vec<R>, FetchError> {
    let items = raw
        .as_array()
        .ok_or_else(|| FetchError::malformed("expected a list of records"))?;

    let valid: Vec<R> = items
        .iter()
        .filter_map(|item| R::deserialize(item).ok())
        .filter(R::is_valid)
        .collect();

    if valid.len() < items.len() {
        debug!(
            received = items.len(),
            kept = valid.len(),
            "Dropped incomplete records"
        );
    }

    Ok(valid)
}

/// Validate a single-entity payload; an incomplete entity yields `None`
pub fn validate_one<R: Record>(raw: &Value) -> Result<Option<R>, FetchError> {
    if !raw.is_object() {
        return Err(FetchError::malformed("expected a single record"));
    }

    let record = R::deserialize(raw).ok().filter(R::is_valid);
    if record.is_none() {
        debug!("Dropped incomplete record");
    }
    Ok(record)
}
