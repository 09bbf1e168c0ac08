//! Output module for run reports
//!
//! This module handles:
//! - Queue and corpus statistics from the database
//! - Batch summaries at the end of a run

pub mod stats;

pub use stats::{load_statistics, log_batch_summary, print_statistics, SiteStatistics};
