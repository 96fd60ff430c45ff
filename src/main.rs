//! Site-Harvest main entry point
//!
//! This is the command-line interface for the Site-Harvest crawler.

use clap::Parser;
use site_harvest::config::{load_config_with_hash, Config};
use site_harvest::crawler::{Coordinator, HtmlParser, HttpFetcher};
use site_harvest::ledger::DedupLedger;
use site_harvest::stats::print_summary;
use site_harvest::store::{ContentStore, SqliteContentStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Site-Harvest: a bounded, concurrent site crawler
///
/// Site-Harvest crawls a website from a start URL within a depth and link
/// budget, extracts the text of every page and stores it, never fetching a
/// URL or storing a piece of content twice.
#[derive(Parser, Debug)]
#[command(name = "site-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded, concurrent site crawler", long_about = None)]
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

    /// Forget every URL and content hash claimed by previous runs
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "stream"])]
    dry_run: bool,

    /// Show ledger and content store statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stream", "fresh"])]
    stats: bool,

    /// Print each result as a JSON line as soon as it is crawled
    #[arg(long)]
    stream: bool,

    /// Crawl this URL instead of the configured start-url
    #[arg(long, value_name = "URL")]
    start_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(start_url) = cli.start_url {
        tracing::info!("Overriding start URL with {}", start_url);
        config.crawler.start_url = start_url;
    }

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, cli.fresh, cli.stream).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so that `--stream` output on stdout stays parseable.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_harvest=info,warn"),
            1 => EnvFilter::new("site_harvest=debug,info"),
            2 => EnvFilter::new("site_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let seed = site_harvest::normalize_url(&config.crawler.start_url)?;

    println!("=== Site-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", seed);
    println!("  Max links: {}", config.crawler.max_links);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Workers: {}", config.crawler.max_threads);
    println!("  Traversal: {:?}", config.crawler.traversal);
    println!("  Same site only: {}", config.crawler.same_site_only);
    println!("  Resume from checkpoint: {}", config.crawler.resume);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Ledger: {}", config.output.ledger_path);
    if config.crawler.skip_storage {
        println!("  Content store: disabled (skip-storage)");
    } else {
        println!("  Content store: {}", config.output.content_path);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl at most {} pages starting from {}",
        config.crawler.max_links.saturating_add(1),
        seed
    );

    Ok(())
}

/// Handles the --stats mode: shows what previous runs left behind
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Site-Harvest Statistics ===\n");

    println!("Ledger: {}", config.output.ledger_path);
    let ledger = DedupLedger::open(Path::new(&config.output.ledger_path));
    match ledger.persisted_counts() {
        Some((urls, hashes)) => {
            println!("  Claimed URLs: {}", urls);
            println!("  Claimed content hashes: {}", hashes);
            println!("  Checkpointed frontier entries: {}", ledger.load_frontier().len());
        }
        None => println!("  Unavailable"),
    }

    if !config.crawler.skip_storage {
        println!("\nContent store: {}", config.output.content_path);
        let store = SqliteContentStore::new(Path::new(&config.output.content_path))?;
        println!("  Stored pages: {}", store.count_pages()?);
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    fresh: bool,
    stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = Arc::new(DedupLedger::open(Path::new(&config.output.ledger_path)));
    if fresh {
        tracing::info!("Starting fresh crawl (forgetting previous claims)");
        ledger.reset();
    }

    let fetcher = HttpFetcher::new(
        &config.user_agent,
        Duration::from_secs(config.crawler.fetch_timeout_secs),
    )?;

    let mut coordinator = Coordinator::new(
        config.crawler.clone(),
        Arc::new(fetcher),
        Arc::new(HtmlParser::new()),
        ledger,
    )?;

    if !config.crawler.skip_storage {
        match SqliteContentStore::new(Path::new(&config.output.content_path)) {
            Ok(store) => {
                let store: Arc<dyn ContentStore> = Arc::new(store);
                coordinator = coordinator.with_content_store(store);
            }
            Err(e) => tracing::warn!(
                "Content store at {} is unavailable ({}); pages will not be stored",
                config.output.content_path,
                e
            ),
        }
    }

    let stop = coordinator.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    if stream {
        let mut results = coordinator.stream();
        while let Some(result) = results.next().await {
            println!("{}", serde_json::to_string(&result)?);
        }
        let summary = results.finish().await?;
        tracing::info!(
            "Streamed {} results ({} duplicates, {} failures)",
            summary.results,
            summary.duplicates,
            summary.fetch_failures + summary.parse_failures
        );
    } else {
        match coordinator.run().await {
            Ok(report) => print_summary(&report.summary),
            Err(e) => {
                tracing::error!("Crawl failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
