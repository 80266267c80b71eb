//! Email Harvester main entry point
//!
//! This is the command-line interface for the Email Harvester crawler.

use anyhow::Context;
use clap::Parser;
use email_harvester::config::{load_config_with_hash, Config};
use email_harvester::crawler::{build_runtime, run_batch, Coordinator};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Email Harvester: a bounded, parallel e-mail crawler
///
/// Email Harvester reads websites from a SQLite table, crawls each one to a
/// bounded depth and writes the e-mail addresses it finds back to the
/// database.
#[derive(Parser, Debug)]
#[command(name = "email-harvester")]
#[command(version = "1.0.0")]
#[command(about = "A bounded, parallel e-mail crawler", long_about = None)]
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

    /// Crawl these URLs and print their e-mails instead of using the database
    #[arg(long = "url", value_name = "URL", conflicts_with = "dry_run")]
    urls: Vec<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let runtime = build_runtime(config.crawler.workers).context("Failed to start runtime")?;

    if cli.urls.is_empty() {
        runtime.block_on(handle_batch(config))
    } else {
        runtime.block_on(handle_urls(config, cli.urls))
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("email_harvester=info,warn"),
            1 => EnvFilter::new("email_harvester=debug,info"),
            2 => EnvFilter::new("email_harvester=trace,debug"),
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

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Email Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Max links per page: {}", config.crawler.max_links_per_page);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Max active roots: {}", config.crawler.max_active_roots);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Priority keywords: {:?}", config.crawler.priority_keywords);
    println!("  Skipped domains ({}):", config.crawler.skip_domains.len());
    for domain in &config.crawler.skip_domains {
        println!("    - {}", domain);
    }
    println!(
        "  Skipped e-mail patterns ({}):",
        config.crawler.skip_email_patterns.len()
    );
    for pattern in &config.crawler.skip_email_patterns {
        println!("    - {}", pattern);
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nDatabase: {}", config.database.path);
    println!(
        "  Input: {}({}, {})",
        config.input.table, config.input.id_field, config.input.url_field
    );
    println!(
        "  Output: {}({}, {}) limited to {} bytes",
        config.output.table,
        config.output.id_field,
        config.output.emails_field,
        config.output.emails_field_length
    );
    println!(
        "  Batches of {} from offset {}",
        config.processing.batch_size, config.processing.start_offset
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the main batch operation over the database
async fn handle_batch(config: Config) -> anyhow::Result<()> {
    tracing::info!("Harvesting e-mails for websites in {}", config.database.path);

    match run_batch(config).await {
        Ok(summary) => {
            tracing::info!(
                "Harvest completed successfully: {} of {} websites stored",
                summary.results_stored,
                summary.websites_read
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles --url mode: crawls the given URLs and prints their e-mails
async fn handle_urls(config: Config, urls: Vec<String>) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(&config.crawler, &config.user_agent)?;
    let results = coordinator.crawl_batch(&urls).await?;
    coordinator.shutdown();

    for (url, emails) in &results {
        let joined: Vec<&str> = emails.iter().map(String::as_str).collect();
        println!("{}: {}", url, joined.join(", "));
    }

    tracing::info!("{}", coordinator.statistics().snapshot());
    Ok(())
}
