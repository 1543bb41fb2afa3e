//! Ency-Harvest: a concurrent encyclopedia crawler
//!
//! This crate walks the alphabetical index of a medical encyclopedia, discovers
//! the article pages each index letter links to, and turns every article into a
//! section-structured [`Document`](crawler::Document). Discovery tasks feed a
//! bounded work queue that one or more consumers drain.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Ency-Harvest operations
///
/// Per-article failures never surface here; they are reported as
/// [`ArticleOutcome`](crawler::ArticleOutcome) values. Only errors that make the
/// whole run meaningless end up in this enum.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Work queue protocol violation: {0}")]
    Queue(#[from] crawler::QueueError),

    #[error("Invalid pipeline transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PipelineStage,
        to: state::PipelineStage,
    },

    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing scheme in URL: {0}")]
    MissingScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Ency-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{ArticleOutcome, Document, Pipeline};
pub use state::PipelineStage;
pub use url::{generate_index_urls, IndexUrl};
