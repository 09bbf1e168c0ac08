//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::SiteState;
use crate::storage::{PageDocument, SiteRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: SiteState, to: SiteState },

    #[error("Duplicate document: {0}")]
    Duplicate(String),

    #[error("Document too large: {0}")]
    TooLarge(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Covers the two collections the pipeline works against: the site registry
/// (units of work) and the page documents (the deduplicated corpus).
/// Implementations must make `claim_next_site` atomic with respect to other
/// connections to the same store.
pub trait Storage {
    // ===== Site Registry =====

    /// Registers a site in the `Pending` state
    ///
    /// Returns false if a site with this address already exists; the existing
    /// record is left untouched.
    fn insert_site(&mut self, address: &str, tenant_id: Option<&str>) -> StorageResult<bool>;

    /// Gets a site by its raw address
    fn get_site(&self, address: &str) -> StorageResult<Option<SiteRecord>>;

    /// Atomically selects the oldest `Pending` site and marks it `Claimed`
    fn claim_next_site(&mut self) -> StorageResult<Option<SiteRecord>>;

    /// Moves a site from `from` to `to`
    ///
    /// Fails with `InvalidTransition` if the transition is not legal or the
    /// site is not currently in `from`.
    fn transition_site(&mut self, address: &str, from: SiteState, to: SiteState)
        -> StorageResult<()>;

    /// Records a failed fetch attempt on a `Claimed` site
    ///
    /// Increments the retry count; the site becomes `Errored` once the count
    /// reaches `retry_limit`, and `Pending` otherwise.
    fn record_failed_attempt(&mut self, address: &str, retry_limit: u32)
        -> StorageResult<SiteRecord>;

    /// Returns every `Errored` site to `Pending` with a zero retry count
    fn reset_errored_sites(&mut self) -> StorageResult<u64>;

    /// Counts sites in a given state
    fn count_sites_by_state(&self, state: SiteState) -> StorageResult<u64>;

    // ===== Page Documents =====

    /// Checks whether content with this hash is already stored for the site
    fn document_exists(&self, site_key: &str, content_hash: &str) -> StorageResult<bool>;

    /// Checks whether any document is stored for the site
    fn site_has_documents(&self, site_key: &str) -> StorageResult<bool>;

    /// Inserts a new document
    ///
    /// Fails with `Duplicate` on a uniqueness violation and `TooLarge` when the
    /// store refuses the size of the row.
    fn insert_document(&mut self, document: &PageDocument) -> StorageResult<()>;

    /// Overwrites the stored document with the same site key and content hash
    ///
    /// Returns false if no such document exists.
    fn update_document(&mut self, document: &PageDocument) -> StorageResult<bool>;

    /// Gets all documents stored for a site, oldest first
    fn get_documents_for_site(&self, site_key: &str) -> StorageResult<Vec<PageDocument>>;

    // ===== Statistics =====

    /// Gets total document count
    fn count_documents(&self) -> StorageResult<u64>;

    /// Gets the number of distinct site keys with at least one document
    fn count_document_sites(&self) -> StorageResult<u64>;
}
