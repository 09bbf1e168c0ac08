//! Corpus-Sieve: a deduplicating crawl-to-corpus pipeline
//!
//! This crate claims target sites from a shared registry, pulls their pages from
//! a remote crawl provider, reduces the markup to clean text and stores each
//! distinct piece of content once per site for downstream retrieval.

pub mod config;
pub mod content;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Corpus-Sieve operations
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Crawl provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid seed line {line}: {message}")]
    Seed { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    #[error("Environment variable {0} is not set")]
    MissingApiKey(String),
}

/// Failures of a single crawl provider call
///
/// Every variant counts as one failed fetch attempt for the site.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Provider returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Provider response for {url} exceeded {limit} bytes")]
    TooLarge { url: String, limit: usize },

    #[error("Malformed provider payload for {url}: {message}")]
    Malformed { url: String, message: String },
}

/// Result type alias for Corpus-Sieve operations
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use content::{content_hash, HtmlReducer, MarkupReducer};
pub use crawler::{run_batch, CancelToken, CrawlProvider, SessionRunner, SiteQueue};
pub use state::SiteState;
pub use storage::{InsertOutcome, PageDocument, SiteRecord};
pub use url::normalize_site_url;
