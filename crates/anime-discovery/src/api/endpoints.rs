//! Request descriptions for the Jikan endpoints the client consumes.
//!
//! An [`ApiRequest`] is transport-agnostic: the HTTP client turns it into a
//! URL, test doubles match on it directly.

use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Media with their own reviews and recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Anime,
    Manga,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Anime => "anime",
            MediaKind::Manga => "manga",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GET request relative to the API base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub path: String,
    pub params: Vec<(&'static str, String)>,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.push((key, value.to_string()));
        self
    }

    /// Add a parameter only when there is a value to send
    pub fn param_opt(self, key: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Page number sent with the request, 1 when absent
    pub fn page(&self) -> u32 {
        self.get_param("page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(1)
    }

    /// Full URL with percent-encoded query string
    pub fn url(&self, base_url: &str) -> Result<reqwest::Url, FetchError> {
        let raw = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        reqwest::Url::parse_with_params(&raw, self.params.iter().map(|(k, v)| (*k, v.as_str())))
            .map_err(|e| FetchError::Transport(format!("invalid request URL {}: {}", raw, e)))
    }

    /// Keyword search over a collection (`/anime`, `/manga`, `/clubs`)
    pub fn search(collection: &str, query: &str, page: u32, limit: u32) -> Self {
        Self::new(collection)
            .param("q", query)
            .param("page", page)
            .param("limit", limit)
    }

    /// Top anime, optionally narrowed by a ranking filter
    pub fn top_anime(filter: Option<&str>, limit: u32) -> Self {
        Self::new("/top/anime")
            .param_opt("filter", filter)
            .param("limit", limit)
    }

    pub fn anime(id: u32) -> Self {
        Self::new(format!("/anime/{}", id))
    }

    pub fn manga(id: u32) -> Self {
        Self::new(format!("/manga/{}", id))
    }

    pub fn club(id: u32) -> Self {
        Self::new(format!("/clubs/{}", id))
    }

    pub fn reviews(kind: MediaKind, id: u32, page: u32) -> Self {
        Self::new(format!("/{}/{}/reviews", kind, id)).param("page", page)
    }

    pub fn recommendations(kind: MediaKind, id: u32) -> Self {
        Self::new(format!("/{}/{}/recommendations", kind, id))
    }

    pub fn videos(anime_id: u32) -> Self {
        Self::new(format!("/anime/{}/videos", anime_id))
    }

    pub fn club_members(club_id: u32, page: u32) -> Self {
        Self::new(format!("/clubs/{}/members", club_id)).param("page", page)
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_is_encoded() {
        let request = ApiRequest::search("/anime", "fullmetal alchemist & co", 2, 20);
        let url = request.url("https://api.jikan.moe/v4").unwrap();
        assert_eq!(url.path(), "/v4/anime");
        assert_eq!(
            url.query(),
            Some("q=fullmetal+alchemist+%26+co&page=2&limit=20")
        );
    }

    #[test]
    fn test_top_anime_without_filter() {
        let request = ApiRequest::top_anime(None, 10);
        assert_eq!(request.to_string(), "/top/anime?limit=10");
        assert_eq!(request.get_param("filter"), None);

        let request = ApiRequest::top_anime(Some("airing"), 10);
        assert_eq!(request.to_string(), "/top/anime?filter=airing&limit=10");
    }

    #[test]
    fn test_sub_resource_paths() {
        assert_eq!(
            ApiRequest::reviews(MediaKind::Manga, 2, 3).to_string(),
            "/manga/2/reviews?page=3"
        );
        assert_eq!(ApiRequest::videos(1).to_string(), "/anime/1/videos");
        assert_eq!(ApiRequest::club_members(9, 1).page(), 1);
        assert_eq!(ApiRequest::anime(5).page(), 1);
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let url = ApiRequest::anime(1).url("http://localhost:8080/v4/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/v4/anime/1");
    }
}
