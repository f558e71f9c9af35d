//! Logging infrastructure for the discovery client.
//!
//! Console logging by default, with an optional daily-rotated file layer and
//! module-specific log levels.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log directory path
    pub log_dir: String,
    /// Component name (used for log file naming)
    pub component: String,
    /// Default log level
    pub default_level: Level,
    /// Enable console output
    pub console: bool,
    /// Enable file output
    pub file: bool,
    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            component: "anime-discovery".to_string(),
            default_level: Level::INFO,
            console: true,
            file: false,
            json_format: false,
        }
    }
}

/// Initialize logging with the given configuration
///
/// Sets up tracing with:
/// - Console output for the interactive session
/// - Optional daily file rotation, plain or JSON
/// - Module-specific log levels, overridable through `RUST_LOG`
pub fn init(config: LogConfig) -> Result<()> {
    let log_dir = Path::new(&config.log_dir);
    if config.file {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", config.log_dir))?;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config)));

    let mut layers = Vec::new();

    // Console layer (human-readable, stderr keeps stdout for results)
    if config.console {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_span_events(FmtSpan::NONE)
            .with_writer(std::io::stderr)
            .boxed();
        layers.push(console_layer);
    }

    // File layer with rotation
    if config.file {
        let file_appender = tracing_appender::rolling::daily(log_dir, &config.component);

        let file_layer = if config.json_format {
            // JSON format for structured logs
            fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(file_appender)
                .boxed()
        } else {
            // Human-readable format
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(file_appender)
                .boxed()
        };

        layers.push(file_layer);
    }

    // Initialize the subscriber
    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::info!(
        component = %config.component,
        log_dir = %config.log_dir,
        "Logging initialized"
    );

    Ok(())
}

/// Filter used when `RUST_LOG` is not set
fn default_directives(config: &LogConfig) -> String {
    format!(
        "{}={},shared={},hyper=warn,reqwest=warn,h2=warn",
        config.component.replace('-', "_"),
        config.default_level,
        config.default_level
    )
}

/// Build a [`LogConfig`] from the `[logging]` section of the config file
pub fn from_settings(settings: &crate::config::LoggingConfig, component: &str) -> LogConfig {
    let default_level = settings.default_level.parse().unwrap_or(Level::INFO);
    LogConfig {
        log_dir: settings.log_dir.clone(),
        component: component.to_string(),
        default_level,
        console: settings.console,
        file: settings.file,
        json_format: settings.json_format,
    }
}
