//! Allpages-Harvester main entry point
//!
//! This is the command-line interface for the Allpages-Harvester article harvester.

use allpages_harvester::config::{load_config_with_hash, Config};
use allpages_harvester::crawler::Coordinator;
use allpages_harvester::output::print_report;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Allpages-Harvester: a polite wiki article harvester
///
/// Allpages-Harvester walks a paginated AllPages index, fetches every listed
/// article with bounded concurrency and random politeness delays, and stores
/// the normalized paragraph text of each article as a plain-text document.
#[derive(Parser, Debug)]
#[command(name = "allpages-harvester")]
#[command(version)]
#[command(about = "A polite wiki article harvester", long_about = None)]
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

    /// Rediscover links even if a links cache for this index exists
    #[arg(long)]
    refresh_links: bool,

    /// Discover (and cache) links, then exit without harvesting
    #[arg(long, conflicts_with = "dry_run")]
    discover_only: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with_all = ["discover_only", "refresh_links"])]
    dry_run: bool,
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

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight writes");
            let _ = shutdown_tx.send(true);
        }
    });

    let coordinator = Coordinator::new(config)?.with_shutdown(shutdown_rx);

    if cli.discover_only {
        handle_discover(&coordinator, cli.refresh_links).await
    } else {
        handle_harvest(&coordinator, cli.refresh_links).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("allpages_harvester=info,warn"),
            1 => EnvFilter::new("allpages_harvester=debug,info"),
            2 => EnvFilter::new("allpages_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Allpages-Harvester Dry Run ===\n");

    println!("Site:");
    println!("  Index URL: {}", config.site.index_url);
    println!("  Index table selector: {}", config.site.index_table_selector);

    println!("\nCrawler:");
    println!("  Concurrency limit: {}", config.crawler.concurrency_limit);
    println!("  Delay candidates: {:?}ms", config.crawler.delay_candidates);
    println!("  Skip existing: {}", config.crawler.skip_existing);
    println!("  Skip empty: {}", config.crawler.skip_empty);
    println!("  Danda pipes: {}", config.crawler.danda_pipes);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!(
        "  Referer: {}",
        config
            .http
            .referer
            .as_deref()
            .unwrap_or(&config.site.index_url)
    );
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!(
        "  Retries: {} attempts, {}ms base, x{}",
        config.http.retry_max_attempts,
        config.http.retry_backoff_base_ms,
        config.http.retry_backoff_factor
    );

    println!("\nOutput:");
    println!("  Documents: {}", config.output.output_dir);
    match &config.output.links_path {
        Some(path) => println!("  Links cache: {}", path),
        None => println!("  Links cache: disabled"),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --discover-only mode
async fn handle_discover(
    coordinator: &Coordinator,
    refresh_links: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match coordinator.discover(refresh_links).await {
        Ok(links) => {
            println!("✓ Discovered {} links from {}", links.len(), coordinator.index_url());
            Ok(())
        }
        Err(e) => {
            tracing::error!("Discovery failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the main harvest operation
async fn handle_harvest(
    coordinator: &Coordinator,
    refresh_links: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match coordinator.run(refresh_links).await {
        Ok(report) => {
            print_report(&report);
            if report.was_cancelled() {
                tracing::info!("Harvest interrupted; rerun with skip-existing to resume");
            } else {
                tracing::info!("Harvest completed");
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
