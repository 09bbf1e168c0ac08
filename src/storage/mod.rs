//! Storage module for the site registry and the document corpus
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - Site records and their queue state
//! - Page documents with per-site content uniqueness
//! - Importing seed lists into the site registry

mod schema;
mod seed;
mod sqlite;
mod traits;

pub use seed::{import_seeds, parse_seed_line, SeedEntry, SeedReport};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::SiteState;
use crate::CorpusError;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, CorpusError> {
    SqliteStorage::new(path)
}

/// One target site and its crawl progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRecord {
    /// Address as supplied by the seed list, not normalized
    pub address: String,
    /// Correlates every document stored for this site
    pub tenant_id: Option<String>,
    pub state: SiteState,
    /// Failed fetch attempts so far
    pub retry_count: u32,
    pub claimed_at: Option<String>,
    pub updated_at: String,
}

/// One deduplicated piece of cleaned page content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDocument {
    /// Hash of cleaned text followed by the page URL
    pub document_id: String,
    /// Normalized site address; the dedup partition
    pub site_key: String,
    pub tenant_id: String,
    /// Exact page URL the content came from
    pub source_url: String,
    pub scraped_at: String,
    /// Cleaned text, possibly truncated
    pub content: String,
    /// Hash of the untruncated cleaned text
    pub content_hash: String,
}

/// Result of offering a document to the dedup store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new document was written
    Inserted,
    /// Existing content was overwritten (update-existing policy on)
    Updated,
    /// Same content is already stored for this site
    SkippedDuplicate,
    /// The store refused the document even after truncation
    SkippedTooLarge,
}

impl InsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Updated => "updated",
            Self::SkippedDuplicate => "skipped_duplicate",
            Self::SkippedTooLarge => "skipped_too_large",
        }
    }
}
