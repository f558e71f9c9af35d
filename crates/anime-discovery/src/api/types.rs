//! Jikan API v4 response types.
//!
//! Records are deserialized leniently: only the identifier is mandatory at the
//! serde level, everything else is checked by [`Record::is_valid`] so that a
//! single incomplete entry never fails the whole batch.

use crate::error::FetchError;
use crate::validation::{Record, RecordId};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level `{data, pagination?}` wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub data: Value,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl Envelope {
    /// Split a raw body into payload and pagination block
    pub fn from_value(body: Value) -> Result<Self, FetchError> {
        if !body.is_object() {
            return Err(FetchError::malformed("response body is not an object"));
        }
        Ok(serde_json::from_value(body)?)
    }
}

/// Pagination metadata as sent by the API
///
/// Jikan omits fields on some endpoints, so every field is optional here and
/// defaults are applied in [`crate::pagination::PaginationMeta`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub last_visible_page: Option<u32>,
    pub has_next_page: Option<bool>,
    pub current_page: Option<u32>,
}

/// Image URLs in one format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSet {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

impl ImageSet {
    fn best(&self) -> Option<&str> {
        [&self.large_image_url, &self.image_url, &self.small_image_url]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|url| !url.trim().is_empty())
    }
}

/// Images attached to an entity, jpg preferred over webp
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Images {
    pub jpg: Option<ImageSet>,
    pub webp: Option<ImageSet>,
}

impl Images {
    pub fn primary_url(&self) -> Option<&str> {
        self.jpg
            .as_ref()
            .and_then(ImageSet::best)
            .or_else(|| self.webp.as_ref().and_then(ImageSet::best))
    }
}

/// MAL entity (genre, studio, author, etc.)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalEntity {
    pub mal_id: u32,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub name: String,
    pub url: Option<String>,
}

/// Aired dates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aired {
    pub from: Option<String>,
    pub to: Option<String>,
    pub string: Option<String>,
}

impl Aired {
    /// First air date, if the API sent a parseable timestamp
    pub fn started_on(&self) -> Option<NaiveDate> {
        self.from
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.date_naive())
    }
}

/// Anime, as returned by search, top lists and `/anime/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    pub mal_id: u32,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Images,

    // Titles
    #[serde(default)]
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,

    // Type and status
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub source: Option<String>,
    pub episodes: Option<u32>,
    pub status: Option<String>,
    pub airing: Option<bool>,
    pub aired: Option<Aired>,
    pub duration: Option<String>,
    pub rating: Option<String>,

    // Scores and rankings
    pub score: Option<f64>,
    pub scored_by: Option<u32>,
    pub rank: Option<u32>,
    pub popularity: Option<u32>,
    pub members: Option<u32>,
    pub favorites: Option<u32>,

    pub synopsis: Option<String>,
    pub season: Option<String>,
    pub year: Option<u32>,

    #[serde(default)]
    pub genres: Vec<MalEntity>,
    #[serde(default)]
    pub themes: Vec<MalEntity>,
    #[serde(default)]
    pub studios: Vec<MalEntity>,
}

/// Manga, as returned by search and `/manga/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manga {
    pub mal_id: u32,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Images,
    #[serde(default)]
    pub title: String,
    pub title_english: Option<String>,
    #[serde(rename = "type")]
    pub manga_type: Option<String>,
    pub chapters: Option<u32>,
    pub volumes: Option<u32>,
    pub status: Option<String>,
    pub publishing: Option<bool>,
    pub score: Option<f64>,
    pub rank: Option<u32>,
    pub popularity: Option<u32>,
    pub members: Option<u32>,
    pub synopsis: Option<String>,
    #[serde(default)]
    pub genres: Vec<MalEntity>,
    #[serde(default)]
    pub authors: Vec<MalEntity>,
}

/// Community club
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    pub mal_id: u32,
    #[serde(default)]
    pub name: String,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Images,
    pub members: Option<u32>,
    pub category: Option<String>,
    pub created: Option<String>,
    pub access: Option<String>,
}

/// Entry of `/clubs/{id}/members`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubMember {
    #[serde(default)]
    pub username: String,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Images,
}

/// Author of a review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewUser {
    #[serde(default)]
    pub username: String,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Images,
}

/// User review of an anime or manga
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub mal_id: u32,
    pub url: Option<String>,
    #[serde(default)]
    pub user: ReviewUser,
    #[serde(default)]
    pub review: String,
    pub score: Option<u32>,
    pub date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_spoiler: Option<bool>,
}

/// Thumbnails of a YouTube trailer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailerImages {
    pub image_url: Option<String>,
    pub medium_image_url: Option<String>,
    pub large_image_url: Option<String>,
    pub maximum_image_url: Option<String>,
}

/// YouTube trailer reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trailer {
    pub youtube_id: Option<String>,
    pub url: Option<String>,
    pub embed_url: Option<String>,
    #[serde(default)]
    pub images: TrailerImages,
}

/// Promotional video from `/anime/{id}/videos`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub trailer: Trailer,
}

/// Entity a recommendation points to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEntry {
    pub mal_id: u32,
    pub url: Option<String>,
    #[serde(default)]
    pub images: Images,
    #[serde(default)]
    pub title: String,
}

/// "If you liked this, try..." entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub entry: RecommendationEntry,
    pub votes: Option<u32>,
}

/// Error body returned by Jikan alongside non-2xx statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JikanError {
    pub status: Option<u16>,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

impl Record for Anime {
    fn id(&self) -> RecordId {
        RecordId::Mal(self.mal_id)
    }

    fn display_name(&self) -> &str {
        &self.title
    }

    fn image_url(&self) -> Option<&str> {
        self.images.primary_url()
    }
}

impl Record for Manga {
    fn id(&self) -> RecordId {
        RecordId::Mal(self.mal_id)
    }

    fn display_name(&self) -> &str {
        &self.title
    }

    fn image_url(&self) -> Option<&str> {
        self.images.primary_url()
    }
}

impl Record for Club {
    fn id(&self) -> RecordId {
        RecordId::Mal(self.mal_id)
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn image_url(&self) -> Option<&str> {
        self.images.primary_url()
    }
}

impl Record for ClubMember {
    fn id(&self) -> RecordId {
        RecordId::Name(self.username.clone())
    }

    fn display_name(&self) -> &str {
        &self.username
    }

    fn image_url(&self) -> Option<&str> {
        self.images.primary_url()
    }
}

impl Record for Review {
    // Reviews are rendered as text blocks
    const GRID: bool = false;

    fn id(&self) -> RecordId {
        RecordId::Mal(self.mal_id)
    }

    fn display_name(&self) -> &str {
        &self.user.username
    }

    fn image_url(&self) -> Option<&str> {
        self.user.images.primary_url()
    }
}

impl Record for Promo {
    fn id(&self) -> RecordId {
        RecordId::Name(self.trailer.youtube_id.clone().unwrap_or_default())
    }

    fn display_name(&self) -> &str {
        &self.title
    }

    fn image_url(&self) -> Option<&str> {
        let images = &self.trailer.images;
        [
            &images.maximum_image_url,
            &images.large_image_url,
            &images.medium_image_url,
            &images.image_url,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|url| !url.trim().is_empty())
    }
}

impl Record for Recommendation {
    fn id(&self) -> RecordId {
        RecordId::Mal(self.entry.mal_id)
    }

    fn display_name(&self) -> &str {
        &self.entry.title
    }

    fn image_url(&self) -> Option<&str> {
        self.entry.images.primary_url()
    }
}

/// Records that have a searchable collection endpoint
pub trait Searchable: Record {
    /// Collection path, e.g. `/anime`
    const COLLECTION: &'static str;
}

impl Searchable for Anime {
    const COLLECTION: &'static str = "/anime";
}

impl Searchable for Manga {
    const COLLECTION: &'static str = "/manga";
}

impl Searchable for Club {
    const COLLECTION: &'static str = "/clubs";
}
