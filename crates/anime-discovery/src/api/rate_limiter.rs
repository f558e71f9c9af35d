//! Client-side throttle for the Jikan rate limits.
//!
//! Every outgoing request first waits for both the per-second and per-minute
//! windows. Time comes from tokio's clock.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Rate limiter with dual constraints (per-second and per-minute)
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two requests
    min_interval: Duration,
    /// Maximum requests per minute
    max_per_minute: u32,
    /// Last request timestamp
    last_request: Option<Instant>,
    /// Request timestamps in the last minute, oldest first
    recent_requests: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_per_second: f64, max_per_minute: u32) -> Self {
        // Rates too small to express as a spacing never release a second request
        let min_interval = if max_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / max_per_second).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        let max_per_minute = max_per_minute.max(1);
        Self {
            min_interval,
            max_per_minute,
            last_request: None,
            recent_requests: VecDeque::with_capacity(max_per_minute.min(1024) as usize),
        }
    }

    /// Wait until a request can be made, respecting both rate limits
    pub async fn acquire(&mut self) {
        self.prune(Instant::now());

        if self.recent_requests.len() >= self.max_per_minute as usize {
            if let Some(&oldest) = self.recent_requests.front() {
                let wait_time = WINDOW.saturating_sub(oldest.elapsed());
                if !wait_time.is_zero() {
                    tracing::debug!(
                        wait_ms = wait_time.as_millis() as u64,
                        "Rate limit: waiting for per-minute limit"
                    );
                    sleep(wait_time).await;
                }
            }
            self.prune(Instant::now());
        }

        if let Some(last) = self.last_request {
            let wait_time = self.min_interval.saturating_sub(last.elapsed());
            if !wait_time.is_zero() {
                tracing::debug!(
                    wait_ms = wait_time.as_millis() as u64,
                    "Rate limit: waiting for per-second limit"
                );
                sleep(wait_time).await;
            }
        }

        let request_time = Instant::now();
        self.last_request = Some(request_time);
        self.recent_requests.push_back(request_time);
    }

    /// Get the current number of requests in the last minute
    pub fn current_minute_count(&mut self) -> usize {
        self.prune(Instant::now());
        self.recent_requests.len()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.recent_requests.front() {
            if now.duration_since(oldest) < WINDOW {
                break;
            }
            self.recent_requests.pop_front();
        }
    }
}
