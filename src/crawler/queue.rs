//! Site queue over the shared site registry
//!
//! Every operation is a single guarded update in the store, so several worker
//! processes can pull from the same registry without stepping on each other.

use crate::crawler::{lock_storage, SharedStorage};
use crate::state::SiteState;
use crate::storage::{SiteRecord, Storage, StorageResult};

/// Claim/release/complete/error transitions for target sites
#[derive(Clone)]
pub struct SiteQueue {
    storage: SharedStorage,
    retry_limit: u32,
}

impl SiteQueue {
    pub fn new(storage: SharedStorage, retry_limit: u32) -> Self {
        Self {
            storage,
            retry_limit,
        }
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Reserves the oldest pending site for this worker
    ///
    /// Returns `None` once nothing is left to claim.
    pub fn claim_next(&self) -> StorageResult<Option<SiteRecord>> {
        let site = lock_storage(&self.storage)?.claim_next_site()?;
        if let Some(site) = &site {
            tracing::debug!(site = %site.address, retries = site.retry_count, "Claimed site");
        }
        Ok(site)
    }

    /// Finishes a site after every page was processed
    pub fn mark_completed(&self, address: &str) -> StorageResult<()> {
        lock_storage(&self.storage)?.transition_site(
            address,
            SiteState::Claimed,
            SiteState::Completed,
        )
    }

    /// Hands a claimed site back without charging a retry
    pub fn mark_released(&self, address: &str) -> StorageResult<()> {
        lock_storage(&self.storage)?.transition_site(
            address,
            SiteState::Claimed,
            SiteState::Pending,
        )
    }

    /// Charges one failed fetch attempt against the site
    ///
    /// The returned record shows whether the site went back to `Pending` or
    /// reached the retry limit and is now `Errored`.
    pub fn mark_attempt_failed(&self, address: &str) -> StorageResult<SiteRecord> {
        lock_storage(&self.storage)?.record_failed_attempt(address, self.retry_limit)
    }

    /// Completes a site whose content is already in the corpus
    pub fn mark_already_satisfied(&self, address: &str) -> StorageResult<()> {
        self.mark_completed(address)
    }
}
