//! Configuration management for the anime discovery client.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    pub logging: LoggingConfig,

    /// Remote API settings
    pub api: ApiConfig,

    /// Search box settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Browse listing settings
    #[serde(default)]
    pub listing: ListingConfig,

    /// Ranking page settings
    #[serde(default)]
    pub ranking: RankingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Jikan API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Jikan API base URL
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Rate limiting settings
    pub rate_limit: RateLimitConfig,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: f64,

    /// Maximum requests per minute
    pub requests_per_minute: u32,
}

/// How typing in the search box turns into requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Nothing is fetched until the user explicitly submits
    Manual,
    /// Every change schedules a search after the quiet period
    #[default]
    Auto,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Manual or debounced search
    pub mode: SearchMode,

    /// Quiet period after the last keystroke, in milliseconds
    pub debounce_ms: u64,

    /// Results requested per page
    pub page_size: u32,
}

/// Browse listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Results requested per page
    pub page_size: u32,
}

/// Ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Category fetched as soon as the ranking page opens
    pub default_category: String,

    /// Entries requested per category
    pub limit: u32,

    /// Re-selecting a category whose fetch failed issues a new request
    pub retry_failed: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::Auto,
            debounce_ms: 500,
            page_size: 20,
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { page_size: 24 }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            default_category: "top".to_string(),
            limit: 10,
            retry_failed: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: false,
                json_format: false,
            },
            api: ApiConfig {
                base_url: "https://api.jikan.moe/v4".to_string(),
                timeout_seconds: 30,
                rate_limit: RateLimitConfig {
                    requests_per_second: 2.0,
                    requests_per_minute: 50,
                },
            },
            search: SearchConfig::default(),
            listing: ListingConfig::default(),
            ranking: RankingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }
}
