//! Content-addressed document store
//!
//! Wraps the storage layer with the dedup policy: fingerprint the full cleaned
//! text, cap what is stored, skip content the site already has, and treat the
//! store's duplicate and size rejections as skips rather than failures.

use crate::content::{content_hash, truncate_to_bytes};
use crate::crawler::{lock_storage, SharedStorage};
use crate::storage::{InsertOutcome, PageDocument, Storage, StorageError, StorageResult};
use chrono::Utc;

/// A cleaned page ready to be offered to the store
#[derive(Debug, Clone)]
pub struct DocumentDraft {
    pub document_id: String,
    pub site_key: String,
    pub tenant_id: String,
    pub source_url: String,
    /// Full cleaned text, before any truncation
    pub cleaned_text: String,
}

/// Dedup policy over the page document collection
#[derive(Clone)]
pub struct DedupStore {
    storage: SharedStorage,
    max_document_bytes: usize,
    update_existing: bool,
}

impl DedupStore {
    pub fn new(storage: SharedStorage, max_document_bytes: usize, update_existing: bool) -> Self {
        Self {
            storage,
            max_document_bytes,
            update_existing,
        }
    }

    /// Checks whether the site already stores content with this fingerprint
    pub fn exists(&self, site_key: &str, content_hash: &str) -> StorageResult<bool> {
        lock_storage(&self.storage)?.document_exists(site_key, content_hash)
    }

    /// Checks whether any document at all is stored for the site
    pub fn site_already_has_documents(&self, site_key: &str) -> StorageResult<bool> {
        lock_storage(&self.storage)?.site_has_documents(site_key)
    }

    /// Offers a cleaned page to the store
    ///
    /// The fingerprint covers the untruncated text; the stored content is cut
    /// to the configured byte cap. A uniqueness violation that slips past the
    /// existence check (another worker wrote the same content in between) is
    /// reported as `SkippedDuplicate`.
    pub fn insert(&self, draft: DocumentDraft) -> StorageResult<InsertOutcome> {
        let hash = content_hash(&draft.cleaned_text);
        let content = truncate_to_bytes(&draft.cleaned_text, self.max_document_bytes);

        let document = PageDocument {
            document_id: draft.document_id,
            site_key: draft.site_key,
            tenant_id: draft.tenant_id,
            source_url: draft.source_url,
            scraped_at: Utc::now().to_rfc3339(),
            content: content.to_string(),
            content_hash: hash,
        };

        let mut storage = lock_storage(&self.storage)?;

        if storage.document_exists(&document.site_key, &document.content_hash)? {
            if !self.update_existing {
                return Ok(InsertOutcome::SkippedDuplicate);
            }

            return match storage.update_document(&document) {
                Ok(true) => Ok(InsertOutcome::Updated),
                // Removed between the check and the update; nothing to overwrite
                Ok(false) => Ok(InsertOutcome::SkippedDuplicate),
                Err(StorageError::TooLarge(_)) => Ok(InsertOutcome::SkippedTooLarge),
                Err(e) => Err(e),
            };
        }

        match storage.insert_document(&document) {
            Ok(()) => Ok(InsertOutcome::Inserted),
            Err(StorageError::Duplicate(_)) => Ok(InsertOutcome::SkippedDuplicate),
            Err(StorageError::TooLarge(_)) => Ok(InsertOutcome::SkippedTooLarge),
            Err(e) => Err(e),
        }
    }
}
