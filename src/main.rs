//! Pricewren main entry point
//!
//! This is the command-line interface for the Pricewren record scraper.

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use pricewren::config::{load_config_with_hash, ScrapeConfig};
use pricewren::output::{print_records, print_summary, summarize};
use pricewren::scrape::{Engine, RunState, ScrapeEvent, ScrapeHandle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Pricewren: a structured record scraper
///
/// Pricewren scrapes structured records (products, quotes) from a set of
/// known demo-site layouts, cleans and deduplicates them, and prints a
/// session summary.
#[derive(Parser, Debug)]
#[command(name = "pricewren")]
#[command(version)]
#[command(about = "A structured record scraper for fixed demo-site layouts", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Site identifier to scrape (defaults to the first configured site)
    #[arg(short, long)]
    site: Option<String>,

    /// Maximum number of records to collect (1-1000)
    #[arg(short, long, value_name = "N")]
    max: Option<u32>,

    /// Inter-request delay in seconds (0.5-10.0)
    #[arg(short, long, value_name = "SECS")]
    delay: Option<f64>,

    /// Keep only records whose category or tags contain this text
    #[arg(short, long, value_name = "TEXT")]
    filter: Option<String>,

    /// Maximum records printed after the summary
    #[arg(long, default_value_t = 20, value_name = "N")]
    show: usize,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be scraped without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e).with_context(|| format!("loading {}", cli.config.display()));
        }
    };

    // Resolve the target site and build the run configuration
    let site_id = match cli.site.clone().or_else(|| {
        config.site.first().map(|s| s.id.clone())
    }) {
        Some(id) => id,
        None => {
            tracing::error!("No sites defined in the configuration");
            bail!("no sites configured");
        }
    };

    let mut run = ScrapeConfig::from_defaults(&config, &site_id);
    if let Some(max) = cli.max {
        run.max_products = max;
    }
    if let Some(delay) = cli.delay {
        run.delay_secs = delay;
    }
    run.category_filter = cli.filter.clone();

    if cli.dry_run {
        handle_dry_run(&config, &run)?;
        return Ok(());
    }

    handle_scrape(config, run, cli.show).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pricewren=info,warn"),
            1 => EnvFilter::new("pricewren=debug,info"),
            2 => EnvFilter::new("pricewren=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(
    config: &pricewren::AppConfig,
    run: &ScrapeConfig,
) -> anyhow::Result<()> {
    pricewren::config::validate_scrape_config(run, config)?;
    // Validation guarantees the site exists past this point
    let site = config
        .site(&run.site)
        .ok_or_else(|| anyhow!("unknown site: {}", run.site))?;

    println!("=== Pricewren Dry Run ===\n");

    println!("Target Site:");
    println!("  Id: {}", site.id);
    println!("  Name: {}", site.name);
    println!("  Base URL: {}", site.base_url);
    println!("  Parser: {:?}", site.parser);
    println!("  Max pages: {}", site.max_pages);
    println!("  Detail pages: {}", site.detail_pages);
    if !site.categories.is_empty() {
        println!("  Known categories: {}", site.categories.join(", "));
    }

    println!("\nRun Configuration:");
    println!("  Max records: {}", run.max_products);
    println!("  Delay: {:.1}s", run.delay_secs.max(site.rate_limit_secs));
    match &run.category_filter {
        Some(filter) => println!("  Category filter: {}", filter),
        None => println!("  Category filter: (none)"),
    }

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Max attempts: {}", config.http.max_attempts);

    println!("\n✓ Configuration is valid");
    println!("✓ Would scrape {} starting at {}", site.id, site.base_url);

    Ok(())
}

/// Handles the main scrape operation
async fn handle_scrape(
    config: pricewren::AppConfig,
    run: ScrapeConfig,
    show: usize,
) -> anyhow::Result<()> {
    let engine = Engine::new(config);
    let mut handle = engine.start(run)?;

    // Ctrl-C requests cooperative cancellation; the run stops at the next
    // page boundary and keeps what it has.
    let cancel = handle.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current page...");
            cancel.cancel();
        }
    });

    drain_events(&mut handle).await;

    let outcome = handle.join().await?;
    let summary = summarize(&outcome);
    print_summary(&summary);

    if show > 0 && !outcome.dataset.is_empty() {
        println!();
        print_records(&outcome.dataset, show);
    }

    match outcome.state {
        RunState::Failed => match outcome.error {
            Some(e) => {
                tracing::error!("Scrape failed: {}", e);
                Err(e.into())
            }
            None => bail!("scrape failed"),
        },
        state => {
            tracing::info!("Scrape {} with {} record(s)", state, outcome.dataset.len());
            Ok(())
        }
    }
}

/// Logs progress events until the run publishes its terminal event.
async fn drain_events(handle: &mut ScrapeHandle) {
    while let Some(event) = handle.next_event().await {
        match event {
            ScrapeEvent::Progress(update) => {
                tracing::info!(
                    "{} ({} collected)",
                    update.current_status,
                    update.items_collected
                );
            }
            ScrapeEvent::Completed { items } => {
                tracing::info!("Run completed with {} item(s)", items);
                break;
            }
            ScrapeEvent::Stopped { items } => {
                tracing::warn!("Run stopped with {} item(s)", items);
                break;
            }
            ScrapeEvent::Failed { items, message } => {
                tracing::error!("Run failed after {} item(s): {}", items, message);
                break;
            }
        }
    }
}
