//! Detail pages: one entity plus its sub-resources.
//!
//! Every (kind, id) pair is a separate slot, so opening a second detail page
//! or loading another sub-resource never disturbs what is already shown.

use crate::api::source::{fetch_entity, fetch_list, fetch_listing, fetch_nested_list};
use crate::api::{
    Anime, ApiRequest, Club, ClubMember, Manga, MediaKind, Promo, Recommendation, Review,
    SharedSource,
};
use crate::coordinator::RequestCoordinator;
use crate::pagination::{accumulate, Listing};
use crate::slot::{DetailKind, SlotKey, SlotState};
use std::sync::Arc;
use tokio::task::JoinHandle;

fn key(kind: DetailKind, id: u32) -> SlotKey {
    SlotKey::Detail { kind, id }
}

/// State of every detail page opened during a session
pub struct DetailSession {
    source: SharedSource,
    anime: RequestCoordinator<Option<Anime>>,
    manga: RequestCoordinator<Option<Manga>>,
    clubs: RequestCoordinator<Option<Club>>,
    reviews: RequestCoordinator<Listing<Review>>,
    recommendations: RequestCoordinator<Vec<Recommendation>>,
    videos: RequestCoordinator<Vec<Promo>>,
    members: RequestCoordinator<Listing<ClubMember>>,
}

impl DetailSession {
    pub fn new(source: SharedSource) -> Self {
        Self {
            source,
            anime: RequestCoordinator::new(),
            manga: RequestCoordinator::new(),
            clubs: RequestCoordinator::new(),
            reviews: RequestCoordinator::new(),
            recommendations: RequestCoordinator::new(),
            videos: RequestCoordinator::new(),
            members: RequestCoordinator::new(),
        }
    }

    pub fn load_anime(&self, id: u32) -> JoinHandle<()> {
        self.anime.fetch(
            key(DetailKind::Anime, id),
            fetch_entity(self.source(), ApiRequest::anime(id)),
        )
    }

    /// `data` is `None` until loaded, and stays `None` if the entity came
    /// back incomplete
    pub fn anime(&self, id: u32) -> SlotState<Option<Anime>> {
        self.anime.state(&key(DetailKind::Anime, id))
    }

    pub fn load_manga(&self, id: u32) -> JoinHandle<()> {
        self.manga.fetch(
            key(DetailKind::Manga, id),
            fetch_entity(self.source(), ApiRequest::manga(id)),
        )
    }

    pub fn manga(&self, id: u32) -> SlotState<Option<Manga>> {
        self.manga.state(&key(DetailKind::Manga, id))
    }

    pub fn load_club(&self, id: u32) -> JoinHandle<()> {
        self.clubs.fetch(
            key(DetailKind::Club, id),
            fetch_entity(self.source(), ApiRequest::club(id)),
        )
    }

    pub fn club(&self, id: u32) -> SlotState<Option<Club>> {
        self.clubs.state(&key(DetailKind::Club, id))
    }

    /// Load a page of reviews; pages after the first are appended
    pub fn load_reviews(&self, kind: MediaKind, id: u32, page: u32) -> JoinHandle<()> {
        self.reviews.fetch_with(
            key(DetailKind::Reviews(kind), id),
            fetch_listing::<Review>(self.source(), ApiRequest::reviews(kind, id, page)),
            move |existing, incoming| accumulate(existing, incoming, page),
        )
    }

    pub fn reviews(&self, kind: MediaKind, id: u32) -> SlotState<Listing<Review>> {
        self.reviews.state(&key(DetailKind::Reviews(kind), id))
    }

    pub fn load_recommendations(&self, kind: MediaKind, id: u32) -> JoinHandle<()> {
        self.recommendations.fetch(
            key(DetailKind::Recommendations(kind), id),
            fetch_list(self.source(), ApiRequest::recommendations(kind, id)),
        )
    }

    pub fn recommendations(&self, kind: MediaKind, id: u32) -> SlotState<Vec<Recommendation>> {
        self.recommendations
            .state(&key(DetailKind::Recommendations(kind), id))
    }

    /// Promotional videos of an anime (`data.promo` of the videos endpoint)
    pub fn load_videos(&self, anime_id: u32) -> JoinHandle<()> {
        self.videos.fetch(
            key(DetailKind::Videos, anime_id),
            fetch_nested_list(self.source(), ApiRequest::videos(anime_id), "promo"),
        )
    }

    pub fn videos(&self, anime_id: u32) -> SlotState<Vec<Promo>> {
        self.videos.state(&key(DetailKind::Videos, anime_id))
    }

    /// Load a page of club members, replacing the previous page
    pub fn load_members(&self, club_id: u32, page: u32) -> JoinHandle<()> {
        self.members.fetch(
            key(DetailKind::Members, club_id),
            fetch_listing(self.source(), ApiRequest::club_members(club_id, page)),
        )
    }

    pub fn members(&self, club_id: u32) -> SlotState<Listing<ClubMember>> {
        self.members.state(&key(DetailKind::Members, club_id))
    }

    fn source(&self) -> SharedSource {
        Arc::clone(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::testing::{anime_json, ScriptedSource};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn review(id: u32, user: &str) -> Value {
        json!({ "mal_id": id, "user": { "username": user }, "review": "Solid." })
    }

    fn reviews_page(first_id: u32, page: u32, has_next: bool) -> Value {
        json!({
            "data": [review(first_id, "alice"), review(first_id + 1, "bob")],
            "pagination": { "has_next_page": has_next, "current_page": page }
        })
    }

    #[tokio::test]
    async fn test_entities_are_keyed_by_id() {
        let source = ScriptedSource::new();
        source.respond("/anime/1", |_| Ok(json!({ "data": anime_json(1, "Cowboy Bebop") })));
        source.respond("/anime/5", |_| {
            Err(FetchError::Status {
                status: 404,
                message: "Resource does not exist".to_string(),
            })
        });
        let detail = DetailSession::new(source.shared());

        detail.load_anime(1).await.unwrap();
        detail.load_anime(5).await.unwrap();

        let bebop = detail.anime(1);
        assert_eq!(bebop.data.unwrap().title, "Cowboy Bebop");
        assert_eq!(bebop.error, None);

        let missing = detail.anime(5);
        assert!(missing.data.is_none());
        assert!(missing.error.unwrap().contains("Resource does not exist"));
    }

    #[tokio::test]
    async fn test_incomplete_entity_reads_as_empty() {
        let source = ScriptedSource::new();
        source.respond("/manga/2", |_| Ok(json!({ "data": { "mal_id": 2, "title": "" } })));
        let detail = DetailSession::new(source.shared());

        detail.load_manga(2).await.unwrap();
        let state = detail.manga(2);
        assert!(state.data.is_none());
        assert_eq!(state.error, None);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_reviews_accumulate_per_media_kind() {
        let source = ScriptedSource::new();
        source.respond("/anime/1/reviews", |request| {
            let page = request.page();
            Ok(reviews_page(page * 10, page, page < 2))
        });
        source.respond("/manga/1/reviews", |_| Ok(reviews_page(500, 1, false)));
        let detail = DetailSession::new(source.shared());

        detail.load_reviews(MediaKind::Anime, 1, 1).await.unwrap();
        detail.load_reviews(MediaKind::Anime, 1, 2).await.unwrap();
        detail.load_reviews(MediaKind::Manga, 1, 1).await.unwrap();

        let anime = detail.reviews(MediaKind::Anime, 1).data;
        assert_eq!(anime.len(), 4);
        assert!(!anime.pagination.has_next_page);
        let ids: Vec<u32> = anime.items.iter().map(|r| r.mal_id).collect();
        assert_eq!(ids, vec![10, 11, 20, 21]);

        assert_eq!(detail.reviews(MediaKind::Manga, 1).data.len(), 2);
    }

    #[tokio::test]
    async fn test_members_pages_replace() {
        let source = ScriptedSource::new();
        source.respond("/clubs/7/members", |request| {
            let user = format!("member{}", request.page());
            Ok(json!({
                "data": [{
                    "username": user,
                    "images": { "jpg": { "image_url": "https://cdn.myanimelist.net/u.jpg" } }
                }],
                "pagination": { "has_next_page": true, "current_page": request.page() }
            }))
        });
        let detail = DetailSession::new(source.shared());

        detail.load_members(7, 1).await.unwrap();
        detail.load_members(7, 2).await.unwrap();

        let members = detail.members(7).data;
        assert_eq!(members.len(), 1);
        assert_eq!(members.items[0].username, "member2");
        assert_eq!(members.pagination.current_page, 2);
    }

    #[tokio::test]
    async fn test_videos_read_promo_list() {
        let source = ScriptedSource::new();
        source.respond("/anime/1/videos", |_| {
            Ok(json!({
                "data": {
                    "promo": [
                        {
                            "title": "PV 1",
                            "trailer": {
                                "youtube_id": "abc123",
                                "images": { "large_image_url": "https://img.youtube.com/vi/abc123/hq.jpg" }
                            }
                        },
                        { "title": "No trailer" }
                    ],
                    "episodes": []
                }
            }))
        });
        let detail = DetailSession::new(source.shared());

        detail.load_videos(1).await.unwrap();
        let videos = detail.videos(1).data;
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].title, "PV 1");
    }

    #[tokio::test]
    async fn test_recommendations_and_club() {
        let source = ScriptedSource::new();
        source.respond("/manga/3/recommendations", |_| {
            Ok(json!({
                "data": [{
                    "entry": {
                        "mal_id": 9,
                        "title": "Vagabond",
                        "images": { "jpg": { "image_url": "https://cdn.myanimelist.net/m/9.jpg" } }
                    },
                    "votes": 12
                }]
            }))
        });
        source.respond("/clubs/4", |_| {
            Ok(json!({
                "data": {
                    "mal_id": 4,
                    "name": "Seinen fans",
                    "images": { "jpg": { "image_url": "https://cdn.myanimelist.net/c/4.jpg" } }
                }
            }))
        });
        let detail = DetailSession::new(source.shared());

        detail.load_recommendations(MediaKind::Manga, 3).await.unwrap();
        detail.load_club(4).await.unwrap();

        let recs = detail.recommendations(MediaKind::Manga, 3).data;
        assert_eq!(recs[0].entry.title, "Vagabond");
        assert!(detail.recommendations(MediaKind::Anime, 3).data.is_empty());
        assert_eq!(detail.club(4).data.unwrap().name, "Seinen fans");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_sub_resource_does_not_block_entity() {
        let source = ScriptedSource::new();
        source.respond("/anime/1", |_| Ok(json!({ "data": anime_json(1, "Monster") })));
        source.respond("/anime/1/reviews", |_| Ok(reviews_page(1, 1, false)));
        source.delay(|request| {
            if request.path.ends_with("/reviews") {
                Duration::from_secs(5)
            } else {
                Duration::ZERO
            }
        });
        let detail = DetailSession::new(source.shared());

        let reviews = detail.load_reviews(MediaKind::Anime, 1, 1);
        detail.load_anime(1).await.unwrap();

        assert!(detail.anime(1).data.is_some());
        assert!(detail.reviews(MediaKind::Anime, 1).loading);

        reviews.await.unwrap();
        assert_eq!(detail.reviews(MediaKind::Anime, 1).data.len(), 2);
    }
}
