//! Corpus-Sieve main entry point
//!
//! This is the command-line interface for the Corpus-Sieve crawl worker.

use clap::Parser;
use corpus_sieve::config::{load_config_with_hash, resolve_api_key, Config};
use corpus_sieve::crawler::{crawl, CancelToken};
use corpus_sieve::output::{load_statistics, log_batch_summary, print_statistics};
use corpus_sieve::storage::{import_seeds, open_storage, Storage};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Corpus-Sieve: a deduplicating crawl-to-corpus worker
///
/// Corpus-Sieve claims target sites from a shared database, crawls them
/// through a hosted crawl provider, reduces each page to clean text and
/// stores every distinct piece of content once per site. Run several
/// workers against the same database to scale out.
#[derive(Parser, Debug)]
#[command(name = "corpus-sieve")]
#[command(version)]
#[command(about = "A deduplicating crawl-to-corpus worker", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Maximum number of sites to process (overrides the config)
    #[arg(long, value_name = "N")]
    max_sites: Option<usize>,

    /// Validate config and show queue state without crawling
    #[arg(long, conflicts_with_all = ["stats", "seed", "reset_errored"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "seed", "reset_errored"])]
    stats: bool,

    /// Register sites from an `address,tenant` list and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["dry_run", "stats", "reset_errored"])]
    seed: Option<PathBuf>,

    /// Return every errored site to the queue and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "seed"])]
    reset_errored: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let max_sites = cli
        .max_sites
        .unwrap_or(config.queue.max_sites_per_run as usize);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, max_sites)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(seed_path) = &cli.seed {
        handle_seed(&config, seed_path)?;
    } else if cli.reset_errored {
        handle_reset_errored(&config)?;
    } else {
        handle_crawl(&config, max_sites).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("corpus_sieve=info,warn"),
            1 => EnvFilter::new("corpus_sieve=debug,info"),
            2 => EnvFilter::new("corpus_sieve=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, max_sites: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Corpus-Sieve Dry Run ===\n");

    println!("Provider:");
    println!("  Endpoint: {}", config.provider.endpoint);
    println!("  Page limit: {}", config.provider.page_limit);
    println!("  Timeout: {}s", config.provider.timeout_secs);
    println!(
        "  API key ({}): {}",
        config.provider.api_key_env,
        if resolve_api_key(config).is_ok() {
            "set"
        } else {
            "MISSING"
        }
    );

    println!("\nQueue:");
    println!("  Retry limit: {}", config.queue.retry_limit);
    println!("  Max sites this run: {}", max_sites);

    println!("\nStore:");
    println!("  Database: {}", config.store.database_path);
    println!("  Max document size: {} bytes", config.store.max_document_bytes);
    println!("  Update existing: {}", config.store.update_existing);
    match config.store.max_value_bytes {
        Some(limit) => println!("  Max stored value: {} bytes", limit),
        None => println!("  Max stored value: SQLite default"),
    }

    println!("\nReducer:");
    println!("  Stripped tags: {}", config.reducer.strip_tags.join(", "));
    println!(
        "  Stripped identifiers: {}",
        config.reducer.strip_identifiers.join(", ")
    );

    let storage = open_storage(Path::new(&config.store.database_path))?;
    let stats = load_statistics(&storage)?;
    let pending = stats.count(corpus_sieve::SiteState::Pending);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would process up to {} of {} pending sites",
        max_sites.min(pending as usize),
        pending
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.store.database_path);

    let storage = open_storage(Path::new(&config.store.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --seed mode: registers sites from a list file
fn handle_seed(config: &Config, seed_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Importing seed list from: {}", seed_path.display());

    let mut storage = open_storage(Path::new(&config.store.database_path))?;
    let reader = BufReader::new(File::open(seed_path)?);
    let report = import_seeds(&mut storage, reader)?;

    println!(
        "✓ Registered {} new sites ({} already present)",
        report.inserted, report.already_present
    );

    Ok(())
}

/// Handles the --reset-errored mode: re-queues sites that hit the retry limit
fn handle_reset_errored(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = open_storage(Path::new(&config.store.database_path))?;
    let reset = storage.reset_errored_sites()?;

    tracing::info!("Reset {} errored sites to pending", reset);
    println!("✓ Reset {} errored sites", reset);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, max_sites: usize) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancelToken::new();

    // Ctrl-C lets the current page write finish, then releases the claim
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing current page");
            signal_token.cancel();
        }
    });

    match crawl(config, max_sites, &cancel).await {
        Ok(summary) => {
            log_batch_summary(&summary);

            let storage = open_storage(Path::new(&config.store.database_path))?;
            let stats = load_statistics(&storage)?;
            tracing::info!(
                "Corpus now holds {} documents from {} sites",
                stats.total_documents,
                stats.sites_with_documents
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Batch failed: {}", e);
            Err(e.into())
        }
    }
}
