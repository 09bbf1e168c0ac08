//! Crawl session runner
//!
//! Drives one claimed site through crawl, per-page reduction and dedup insert,
//! then settles the claim. Every failure is handled here and turned into a
//! queue transition; nothing is raised to the batch loop.

use crate::content::{document_id, MarkupReducer};
use crate::crawler::dedup::{DedupStore, DocumentDraft};
use crate::crawler::provider::{CrawlProvider, CrawledPage};
use crate::crawler::queue::SiteQueue;
use crate::crawler::CancelToken;
use crate::storage::{InsertOutcome, SiteRecord, StorageResult};
use crate::url::normalize_site_url;
use std::sync::Arc;
use std::time::Duration;

/// Per-page results within one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTally {
    pub inserted: usize,
    pub updated: usize,
    pub duplicates: usize,
    pub oversized: usize,
    /// Pages the provider returned without content
    pub empty: usize,
}

impl PageTally {
    fn record(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.inserted += 1,
            InsertOutcome::Updated => self.updated += 1,
            InsertOutcome::SkippedDuplicate => self.duplicates += 1,
            InsertOutcome::SkippedTooLarge => self.oversized += 1,
        }
    }
}

/// How a session left its site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every page processed, site `Completed`
    Completed(PageTally),
    /// Documents already stored for the site; no crawl, site `Completed`
    AlreadySatisfied,
    /// Cancelled during the crawl; site back to `Pending` with no retry charged
    Released(PageTally),
    /// Provider call failed; one retry charged
    AttemptFailed { retry_count: u32, errored: bool },
    /// Seed record lacks an address or tenant; left as claimed
    Malformed,
    /// Store failure; the claim was handed back if possible
    Aborted,
}

/// Runs crawl sessions for claimed sites
pub struct SessionRunner {
    queue: SiteQueue,
    dedup: DedupStore,
    provider: Arc<dyn CrawlProvider>,
    reducer: Arc<dyn MarkupReducer>,
    page_limit: u32,
    provider_timeout: Option<Duration>,
}

impl SessionRunner {
    pub fn new(
        queue: SiteQueue,
        dedup: DedupStore,
        provider: Arc<dyn CrawlProvider>,
        reducer: Arc<dyn MarkupReducer>,
        page_limit: u32,
    ) -> Self {
        Self {
            queue,
            dedup,
            provider,
            reducer,
            page_limit,
            provider_timeout: None,
        }
    }

    /// Bounds each provider call; expiry counts as a failed attempt
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    pub fn queue(&self) -> &SiteQueue {
        &self.queue
    }

    /// Processes one claimed site to a settled state
    pub async fn run(&self, site: &SiteRecord, cancel: &CancelToken) -> SessionOutcome {
        match self.drive(site, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(site = %site.address, "Store failure, abandoning session: {}", e);
                if let Err(release_err) = self.queue.mark_released(&site.address) {
                    tracing::error!(
                        site = %site.address,
                        "Could not release claim: {}",
                        release_err
                    );
                }
                SessionOutcome::Aborted
            }
        }
    }

    async fn drive(&self, site: &SiteRecord, cancel: &CancelToken) -> StorageResult<SessionOutcome> {
        let tenant_id = match seed_fields(site) {
            Some(tenant_id) => tenant_id,
            None => {
                tracing::warn!(
                    site = %site.address,
                    "Seed record is missing an address or tenant id, skipping"
                );
                return Ok(SessionOutcome::Malformed);
            }
        };

        let site_key = normalize_site_url(&site.address);

        if self.dedup.site_already_has_documents(&site_key)? {
            tracing::info!(site = %site_key, "Documents already stored, marking completed");
            self.queue.mark_already_satisfied(&site.address)?;
            return Ok(SessionOutcome::AlreadySatisfied);
        }

        let pages = match self.fetch(&site_key, cancel).await {
            Fetch::Pages(pages) => pages,
            Fetch::Cancelled => {
                tracing::info!(site = %site_key, "Cancelled while crawling, releasing site");
                self.queue.mark_released(&site.address)?;
                return Ok(SessionOutcome::Released(PageTally::default()));
            }
            Fetch::Failed(message) => {
                let record = self.queue.mark_attempt_failed(&site.address)?;
                let errored = record.state.is_terminal();
                tracing::error!(
                    site = %site_key,
                    retries = record.retry_count,
                    errored,
                    "Crawl failed: {}",
                    message
                );
                return Ok(SessionOutcome::AttemptFailed {
                    retry_count: record.retry_count,
                    errored,
                });
            }
        };

        tracing::info!(site = %site_key, pages = pages.len(), "Processing crawled pages");

        let mut tally = PageTally::default();
        for page in pages {
            if cancel.is_cancelled() {
                tracing::info!(site = %site_key, "Cancellation requested, releasing site");
                self.queue.mark_released(&site.address)?;
                return Ok(SessionOutcome::Released(tally));
            }

            let Some(markup) = page.content.as_deref() else {
                tracing::debug!(page = %page.url, "No content returned, skipping");
                tally.empty += 1;
                continue;
            };

            let cleaned = self.reducer.reduce(markup);
            let draft = DocumentDraft {
                document_id: document_id(&cleaned, &page.url),
                site_key: site_key.clone(),
                tenant_id: tenant_id.to_string(),
                source_url: page.url.clone(),
                cleaned_text: cleaned,
            };

            let outcome = self.dedup.insert(draft)?;
            match outcome {
                InsertOutcome::Inserted | InsertOutcome::Updated => {
                    tracing::debug!(page = %page.url, outcome = outcome.as_str(), "Stored page");
                }
                InsertOutcome::SkippedDuplicate => {
                    tracing::info!(page = %page.url, "Duplicate content, skipped");
                }
                InsertOutcome::SkippedTooLarge => {
                    tracing::error!(page = %page.url, "Document too large even after truncation");
                }
            }
            tally.record(outcome);
        }

        self.queue.mark_completed(&site.address)?;
        tracing::info!(
            site = %site_key,
            inserted = tally.inserted,
            duplicates = tally.duplicates,
            "Site completed"
        );
        Ok(SessionOutcome::Completed(tally))
    }

    /// Calls the provider, folding errors and timeouts into one message
    async fn fetch(&self, site_key: &str, cancel: &CancelToken) -> Fetch {
        let call = async {
            let call = self.provider.crawl(site_key, self.page_limit);
            match self.provider_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(_) => Err(format!("timed out after {:?}", limit)),
                },
                None => call.await.map_err(|e| e.to_string()),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Fetch::Cancelled,
            result = call => match result {
                Ok(pages) => Fetch::Pages(pages),
                Err(message) => Fetch::Failed(message),
            },
        }
    }
}

/// Result of one provider call
enum Fetch {
    Pages(Vec<CrawledPage>),
    Failed(String),
    Cancelled,
}

/// Returns the tenant id when both seed fields are present
fn seed_fields(site: &SiteRecord) -> Option<&str> {
    if site.address.trim().is_empty() {
        return None;
    }
    site.tenant_id
        .as_deref()
        .map(str::trim)
        .filter(|tenant| !tenant.is_empty())
}
