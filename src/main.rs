//! Ency-Harvest main entry point
//!
//! This is the command-line interface for the Ency-Harvest encyclopedia crawler.

use anyhow::Context;
use clap::Parser;
use ency_harvest::config::{load_config_with_hash, validate, Config};
use ency_harvest::crawler::Pipeline;
use ency_harvest::output::{print_report, write_outcome};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Ency-Harvest: a concurrent encyclopedia crawler
///
/// Ency-Harvest walks the encyclopedia's A-Z index, fetches every article it
/// links to and prints each one as a sectioned text document.
#[derive(Parser, Debug)]
#[command(name = "ency-harvest")]
#[command(version)]
#[command(about = "A concurrent encyclopedia crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show the configuration and index URLs without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Override the number of consumer tasks
    #[arg(long, value_name = "N")]
    consumers: Option<usize>,

    /// Override the work queue capacity
    #[arg(long, value_name = "N")]
    queue_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(consumers) = cli.consumers {
        config.crawler.consumers = consumers;
    }
    if let Some(capacity) = cli.queue_capacity {
        config.crawler.queue_capacity = capacity;
    }
    validate(&config).context("invalid command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(config)
    } else {
        handle_harvest(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ency_harvest=info,warn"),
            1 => EnvFilter::new("ency_harvest=debug,info"),
            2 => EnvFilter::new("ency_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so stdout carries only the harvested documents
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: Config) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config).context("failed to build HTTP client")?;
    let config = pipeline.config();

    println!("=== Ency-Harvest Dry Run ===\n");

    println!("Pipeline:");
    println!("  Queue capacity: {}", config.crawler.queue_capacity);
    println!("  Consumers: {}", config.crawler.consumers);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Backoff base: {}ms", config.crawler.backoff_base_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nSource:");
    println!("  Base URL: {}", config.source.base_url);
    println!("  Index container id: {}", config.source.index_container_id);
    println!(
        "  Article links: {}*{}",
        config.source.article_prefix, config.source.article_suffix
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    let index_urls = pipeline.index_urls();
    println!("\nIndex pages ({}):", index_urls.len());
    for index in &index_urls {
        println!("  {} {}", index.letter, index.url);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting harvest of {} with {} consumer(s), queue capacity {}",
        config.source.base_url,
        config.crawler.consumers,
        config.crawler.queue_capacity
    );

    let mut pipeline = Pipeline::from_config(config).context("failed to build HTTP client")?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        let stdout = std::io::stdout();
        while let Some(outcome) = rx.recv().await {
            let written = write_outcome(&mut stdout.lock(), &outcome);
            if let Err(e) = written {
                tracing::error!("Failed to write result for {}: {}", outcome.url(), e);
            }
        }
    });

    let report = match pipeline.run(tx).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    printer.await.context("output task failed")?;
    print_report(&report);

    Ok(())
}
