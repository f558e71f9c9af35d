//! Jikan API client with client-side rate limiting.
//!
//! Failed requests are reported, never retried: the only recovery path is a
//! user-initiated refetch.

use super::endpoints::ApiRequest;
use super::rate_limiter::RateLimiter;
use super::source::DataSource;
use super::types::JikanError;
use crate::error::FetchError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Jikan API v4 client
pub struct JikanClient {
    /// HTTP client
    client: Client,
    /// Base URL for Jikan API
    base_url: String,
    /// Shared by every slot so concurrent requests queue for permits
    rate_limiter: Mutex<RateLimiter>,
}

impl JikanClient {
    /// Create a new Jikan client
    pub fn new(
        base_url: String,
        requests_per_second: f64,
        requests_per_minute: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("anime-discovery/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            rate_limiter: Mutex::new(RateLimiter::new(requests_per_second, requests_per_minute)),
        })
    }

    /// Build a client from the `[api]` section of the config file
    pub fn from_config(config: &shared::config::ApiConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            config.rate_limit.requests_per_second,
            config.rate_limit.requests_per_minute,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests issued during the last minute
    pub async fn requests_in_last_minute(&self) -> usize {
        self.rate_limiter.lock().await.current_minute_count()
    }
}

#[async_trait]
impl DataSource for JikanClient {
    async fn get_json(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        let url = request.url(&self.base_url)?;

        // Apply rate limiting before each request
        self.rate_limiter.lock().await.acquire().await;

        debug!(url = %url, "Making API request");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Request error");
            FetchError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            let body = response.json::<Value>().await.map_err(|e| {
                warn!(url = %url, error = %e, "Failed to parse response");
                FetchError::malformed(e.to_string())
            })?;
            debug!(url = %url, "Request successful");
            return Ok(body);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(url = %url, "Rate limited by server");
            return Err(FetchError::RateLimited);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<JikanError>(&error_text)
            .map(|e| e.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        warn!(
            url = %url,
            status = %status,
            error = %error_text,
            "Request failed"
        );

        Err(FetchError::Status {
            status: status.as_u16(),
            message,
        })
    }
}
