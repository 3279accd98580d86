//! pagesweep: paginated listing crawl planner and URL aggregator
//!
//! This crate turns a crawl target (an explicit list of listing pages, a
//! pagination template, or a template whose page count is discovered by
//! probing) into a deduplicated, discovery-ordered list of item URLs, and
//! caches the aggregated result for reuse.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod target;

use thiserror::Error;

/// Main error type for pagesweep operations
///
/// Only configuration and infrastructure problems surface here. Page-level
/// failures are recorded inside the aggregated result instead.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
///
/// These are fatal to a run and are raised before any page is fetched.
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

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),

    #[error("Target '{target}' uses {mode} pagination but has no template")]
    MissingTemplate { target: String, mode: String },

    #[error("Target '{target}' has no page count and no probe result")]
    MissingPageCount { target: String },
}

/// Transport-level failure while fetching a listing page
///
/// Transport failures are considered transient and are retried by the
/// scheduler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },
}

/// Failure to extract item URLs from a listing page
///
/// Extraction failures indicate a content or format problem and are never
/// retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Failed to parse listing page {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// Result type alias for pagesweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use cache::{CacheKey, CrawlCache};
pub use config::Config;
pub use crawler::{Engine, ListingExtractor, PageFetcher};
pub use output::{AggregatedResult, RunHealth};
pub use state::{PageFailure, PageResult};
pub use target::{CrawlTarget, PaginationMode};
