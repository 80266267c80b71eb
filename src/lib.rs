//! Email Harvester: a bounded, parallel e-mail crawler
//!
//! This crate crawls root websites to a bounded link depth, following a
//! limited number of links per page, and collects the e-mail addresses found
//! along the way. Each root is decomposed into page tasks that run on a
//! work-stealing tokio runtime and join their children's results in order.

pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Email Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("Malformed root URL '{url}': {reason}")]
    MalformedRootUrl { url: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Crawler has been shut down")]
    ShutDown,

    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
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

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed link '{href}': {reason}")]
    MalformedLink { href: String, reason: String },
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CompletionSink, Coordinator, CrawlConfig, EmailSet, Website};
pub use output::stats::RuntimeStatistics;
pub use url::{normalize_url, resolve_link};
