//! Batch loop: claim a site, run its session, repeat
//!
//! Sites are processed one at a time. Scaling out means running more
//! processes against the same database, with the claim as the only point of
//! mutual exclusion.

use crate::crawler::session::{SessionOutcome, SessionRunner};
use crate::crawler::CancelToken;
use crate::CorpusError;
use std::time::{Duration, Instant};

/// Totals for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub sites_processed: usize,
    pub completed: usize,
    pub already_satisfied: usize,
    pub released: usize,
    pub failed_attempts: usize,
    pub errored: usize,
    pub malformed: usize,
    pub aborted: usize,
    pub documents_inserted: usize,
    pub documents_updated: usize,
    pub duplicates: usize,
    pub oversized: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl BatchSummary {
    fn record(&mut self, outcome: &SessionOutcome) {
        self.sites_processed += 1;

        let tally = match outcome {
            SessionOutcome::Completed(tally) => {
                self.completed += 1;
                Some(tally)
            }
            SessionOutcome::Released(tally) => {
                self.released += 1;
                Some(tally)
            }
            SessionOutcome::AlreadySatisfied => {
                self.already_satisfied += 1;
                None
            }
            SessionOutcome::AttemptFailed { errored, .. } => {
                self.failed_attempts += 1;
                if *errored {
                    self.errored += 1;
                }
                None
            }
            SessionOutcome::Malformed => {
                self.malformed += 1;
                None
            }
            SessionOutcome::Aborted => {
                self.aborted += 1;
                None
            }
        };

        if let Some(tally) = tally {
            self.documents_inserted += tally.inserted;
            self.documents_updated += tally.updated;
            self.duplicates += tally.duplicates;
            self.oversized += tally.oversized;
        }
    }
}

/// Processes claimed sites until `max_sites` is reached, the queue runs dry
/// or cancellation is requested
///
/// Session failures never stop the loop; only a failure to claim does.
pub async fn run_batch(
    runner: &SessionRunner,
    max_sites: usize,
    cancel: &CancelToken,
) -> Result<BatchSummary, CorpusError> {
    let mut summary = BatchSummary::default();
    let start_time = Instant::now();

    tracing::info!("Starting batch of up to {} sites", max_sites);

    while summary.sites_processed < max_sites {
        if cancel.is_cancelled() {
            tracing::info!("Cancellation requested, stopping before next claim");
            summary.cancelled = true;
            break;
        }

        let site = match runner.queue().claim_next()? {
            Some(site) => site,
            None => {
                tracing::info!("No claimable sites left");
                break;
            }
        };

        let outcome = runner.run(&site, cancel).await;
        summary.record(&outcome);

        if summary.sites_processed % 10 == 0 {
            tracing::info!(
                "Progress: {} sites processed, {} documents stored",
                summary.sites_processed,
                summary.documents_inserted
            );
        }
    }

    // A session may have observed cancellation after the last claim
    summary.cancelled |= cancel.is_cancelled();
    summary.elapsed = start_time.elapsed();

    tracing::info!(
        "Batch finished: {} sites in {:.1}s",
        summary.sites_processed,
        summary.elapsed.as_secs_f64()
    );

    Ok(summary)
}
