//! Configuration module for Corpus-Sieve
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use corpus_sieve::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("corpus.toml")).unwrap();
//! println!("Pages per site: {}", config.provider.page_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ProviderConfig, QueueConfig, ReducerConfig, StoreConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, resolve_api_key,
};
