//! Crawler module: from claimed site to stored documents
//!
//! This module contains the core pipeline logic, including:
//! - The remote crawl provider client
//! - The content-addressed dedup store
//! - The site queue and its state transitions
//! - Per-site crawl sessions and the batch loop

mod cancel;
mod dedup;
mod orchestrator;
mod provider;
mod queue;
mod session;

pub use cancel::CancelToken;
pub use dedup::{DedupStore, DocumentDraft};
pub use orchestrator::{run_batch, BatchSummary};
pub use provider::{build_http_client, CrawlProvider, CrawledPage, SpiderClient};
pub use queue::SiteQueue;
pub use session::{PageTally, SessionOutcome, SessionRunner};

use crate::config::{resolve_api_key, Config, StoreConfig};
use crate::content::HtmlReducer;
use crate::storage::{SqliteStorage, StorageError, StorageResult};
use crate::CorpusError;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Storage handle shared by the queue and the dedup store
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

pub(crate) fn lock_storage(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage
        .lock()
        .map_err(|_| StorageError::Database("Storage lock poisoned".to_string()))
}

/// Opens the database and applies the configured value size limit
pub fn open_shared_storage(config: &StoreConfig) -> Result<SharedStorage, CorpusError> {
    let mut storage = SqliteStorage::new(Path::new(&config.database_path))?;

    if let Some(limit) = config.max_value_bytes {
        let effective = storage.set_max_value_bytes(limit)?;
        if effective != limit {
            tracing::warn!(
                "Requested value size limit {} bytes, SQLite enforces {}",
                limit,
                effective
            );
        }
    }

    Ok(Arc::new(Mutex::new(storage)))
}

/// Wires a session runner from configuration
///
/// Opens the database, resolves the provider API key and builds the HTTP
/// client and markup reducer.
pub fn build_runner(config: &Config) -> Result<SessionRunner, CorpusError> {
    let storage = open_shared_storage(&config.store)?;

    let api_key = resolve_api_key(config)?;
    let provider = SpiderClient::new(&config.provider, api_key)?;

    let queue = SiteQueue::new(storage.clone(), config.queue.retry_limit);
    let dedup = DedupStore::new(
        storage,
        config.store.max_document_bytes,
        config.store.update_existing,
    );

    Ok(SessionRunner::new(
        queue,
        dedup,
        Arc::new(provider),
        Arc::new(HtmlReducer::new(&config.reducer)),
        config.provider.page_limit,
    )
    .with_provider_timeout(Duration::from_secs(config.provider.timeout_secs)))
}

/// Runs one batch of crawl sessions
///
/// This is the main entry point for a worker process. It will:
/// 1. Open the shared database
/// 2. Build the provider client and reducer
/// 3. Claim and process sites until `max_sites`, exhaustion or cancellation
///
/// # Arguments
///
/// * `config` - The pipeline configuration
/// * `max_sites` - Upper bound on sites processed in this batch
/// * `cancel` - Cooperative cancellation signal
pub async fn crawl(
    config: &Config,
    max_sites: usize,
    cancel: &CancelToken,
) -> Result<BatchSummary, CorpusError> {
    let runner = build_runner(config)?;
    run_batch(&runner, max_sites, cancel).await
}
