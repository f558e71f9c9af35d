//! Scripted in-memory data source for unit tests.

use crate::api::{ApiRequest, DataSource, SharedSource};
use crate::error::FetchError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = Box<dyn Fn(&ApiRequest) -> Result<Value, FetchError> + Send + Sync>;
type DelayFn = Box<dyn Fn(&ApiRequest) -> Duration + Send + Sync>;

#[derive(Default)]
struct Inner {
    routes: Mutex<Vec<(String, Handler)>>,
    delay: Mutex<Option<DelayFn>>,
    calls: Mutex<Vec<ApiRequest>>,
}

/// Answers requests by path, newest route first, and records every call
#[derive(Clone, Default)]
pub(crate) struct ScriptedSource {
    inner: Arc<Inner>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> SharedSource {
        Arc::new(self.clone())
    }

    pub fn respond<F>(&self, path: &str, handler: F)
    where
        F: Fn(&ApiRequest) -> Result<Value, FetchError> + Send + Sync + 'static,
    {
        self.inner
            .routes
            .lock()
            .unwrap()
            .push((path.to_string(), Box::new(handler)));
    }

    /// Delay responses; the clock is tokio's, so paused tests stay instant
    pub fn delay<F>(&self, delay: F)
    where
        F: Fn(&ApiRequest) -> Duration + Send + Sync + 'static,
    {
        *self.inner.delay.lock().unwrap() = Some(Box::new(delay));
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|r| r.path == path).count()
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn get_json(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        self.inner.calls.lock().unwrap().push(request.clone());

        let reply = {
            let routes = self.inner.routes.lock().unwrap();
            routes
                .iter()
                .rev()
                .find(|(path, _)| *path == request.path)
                .map(|(_, handler)| handler(request))
                .unwrap_or_else(|| {
                    Err(FetchError::Status {
                        status: 404,
                        message: format!("no route for {}", request.path),
                    })
                })
        };
        let delay = self
            .inner
            .delay
            .lock()
            .unwrap()
            .as_ref()
            .map(|delay| delay(request))
            .unwrap_or_default();

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        reply
    }
}

pub(crate) fn anime_json(id: u32, title: &str) -> Value {
    json!({
        "mal_id": id,
        "url": format!("https://myanimelist.net/anime/{}", id),
        "title": title,
        "images": {
            "jpg": { "image_url": format!("https://cdn.myanimelist.net/images/anime/{}.jpg", id) }
        }
    })
}

/// A list envelope of `count` valid anime with ids starting at `first_id`
pub(crate) fn anime_page(first_id: u32, count: u32, page: u32, has_next_page: bool) -> Value {
    let data: Vec<Value> = (first_id..first_id + count)
        .map(|id| anime_json(id, &format!("Anime {}", id)))
        .collect();
    json!({
        "data": data,
        "pagination": {
            "has_next_page": has_next_page,
            "current_page": page,
            "last_visible_page": if has_next_page { page.saturating_add(1) } else { page }
        }
    })
}
