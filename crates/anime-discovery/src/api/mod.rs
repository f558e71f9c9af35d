//! Jikan API v4 access.
//!
//! This module provides the [`DataSource`] seam, the rate-limited HTTP
//! implementation, request descriptions and response types.

pub mod client;
pub mod endpoints;
pub mod rate_limiter;
pub mod source;
pub mod types;

pub use client::JikanClient;
pub use endpoints::{ApiRequest, MediaKind};
pub use rate_limiter::RateLimiter;
pub use source::{DataSource, SharedSource};
pub use types::*;
