//! Shared library for the anime discovery workspace.
//!
//! This crate provides the ambient pieces every binary needs:
//! - Configuration management
//! - Logging infrastructure

pub mod config;
pub mod logging;

// Re-export commonly used types
pub use config::{Config, SearchMode};
pub use logging::LogConfig;
