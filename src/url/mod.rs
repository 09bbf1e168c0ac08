//! URL handling module for Corpus-Sieve
//!
//! Site addresses come from externally maintained seed lists in mixed formats.
//! This module rewrites them into the canonical site key used as the
//! deduplication partition for stored documents.

mod normalize;

pub use normalize::normalize_site_url;
