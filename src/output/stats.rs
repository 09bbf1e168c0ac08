//! Statistics from the corpus database
//!
//! This module provides functionality for extracting and displaying
//! queue and corpus statistics from the storage layer.

use crate::crawler::BatchSummary;
use crate::state::SiteState;
use crate::storage::Storage;
use crate::CorpusError;
use std::collections::HashMap;

/// Queue and corpus statistics
#[derive(Debug, Clone)]
pub struct SiteStatistics {
    /// Total number of registered sites
    pub total_sites: u64,

    /// Count of sites by state
    pub sites_by_state: HashMap<SiteState, u64>,

    /// Total number of stored documents
    pub total_documents: u64,

    /// Number of distinct sites with at least one document
    pub sites_with_documents: u64,
}

impl SiteStatistics {
    pub fn count(&self, state: SiteState) -> u64 {
        self.sites_by_state.get(&state).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(SiteStatistics)` - Successfully loaded statistics
/// * `Err(CorpusError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<SiteStatistics, CorpusError> {
    let mut sites_by_state = HashMap::new();
    let mut total_sites = 0;

    for state in SiteState::all_states() {
        let count = storage.count_sites_by_state(state)?;
        total_sites += count;
        if count > 0 {
            sites_by_state.insert(state, count);
        }
    }

    Ok(SiteStatistics {
        total_sites,
        sites_by_state,
        total_documents: storage.count_documents()?,
        sites_with_documents: storage.count_document_sites()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &SiteStatistics) {
    println!("=== Corpus Statistics ===\n");

    println!("Sites ({}):", stats.total_sites);
    for state in SiteState::all_states() {
        let count = stats.count(state);
        let percentage = if stats.total_sites > 0 {
            (count as f64 / stats.total_sites as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    println!("Documents:");
    println!("  Stored documents: {}", stats.total_documents);
    println!("  Sites with documents: {}", stats.sites_with_documents);

    if stats.sites_with_documents > 0 {
        println!(
            "  Average per site: {:.1}",
            stats.total_documents as f64 / stats.sites_with_documents as f64
        );
    }
}

/// Logs the totals of a finished batch
pub fn log_batch_summary(summary: &BatchSummary) {
    tracing::info!(
        "Sites: {} processed, {} completed, {} already satisfied, {} released",
        summary.sites_processed,
        summary.completed,
        summary.already_satisfied,
        summary.released
    );
    tracing::info!(
        "Failures: {} failed attempts, {} newly errored, {} malformed, {} aborted",
        summary.failed_attempts,
        summary.errored,
        summary.malformed,
        summary.aborted
    );
    tracing::info!(
        "Documents: {} inserted, {} updated, {} duplicates, {} oversized",
        summary.documents_inserted,
        summary.documents_updated,
        summary.duplicates,
        summary.oversized
    );
    if summary.cancelled {
        tracing::info!("Batch was cancelled; released sites will be retried on the next run");
    }
}
