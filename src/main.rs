//! catwalk main entry point
//!
//! This is the command-line interface for the catwalk latency prober.

use catwalk::config::{load_config_with_hash, Config};
use catwalk::crawler::{
    build_http_client, count_nodes, fetch_root_categories, report_since, CategoryNode, Coordinator,
};
use catwalk::notify::{Notifier, StdoutNotifier, TelegramNotifier};
use catwalk::storage::SqliteStorage;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// catwalk: a catalog latency prober
///
/// catwalk walks the category tree of a catalog API, requests every
/// category concurrently, records status and latency in SQLite and
/// reports slow and failed requests.
#[derive(Parser, Debug)]
#[command(name = "catwalk")]
#[command(version)]
#[command(about = "A catalog latency prober", long_about = None)]
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

    /// Validate config and show the category tree without fetching categories
    #[arg(long, conflicts_with_all = ["stats", "report_since"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "report_since"])]
    stats: bool,

    /// Print the digest for requests recorded since an RFC 3339 timestamp and exit
    #[arg(long, value_name = "TIMESTAMP", conflicts_with_all = ["dry_run", "stats"])]
    report_since: Option<String>,

    /// Print the digest instead of sending it
    #[arg(long)]
    no_notify: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            setup_logging(cli.verbose, cli.quiet, None);
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    setup_logging(cli.verbose, cli.quiet, config.logging.file.as_deref());
    tracing::info!(
        "Configuration loaded from {} (hash: {})",
        cli.config.display(),
        config_hash
    );

    if cli.dry_run {
        handle_dry_run(&config).await?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(since) = cli.report_since.as_deref() {
        handle_report_since(&config, since)?;
    } else {
        handle_run(config, cli.no_notify).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// With a log file the output is appended to it. If the file cannot be
/// opened the subscriber writes to stdout instead.
fn setup_logging(verbose: u8, quiet: bool, file: Option<&str>) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catwalk=info,warn"),
            1 => EnvFilter::new("catwalk=debug,info"),
            2 => EnvFilter::new("catwalk=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let Some(path) = file else {
        builder.init();
        return;
    };

    match open_log_file(Path::new(path)) {
        Ok(log_file) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(log_file))
            .init(),
        Err(e) => {
            builder.init();
            tracing::info!("Cannot open log file {} ({}); logging to stdout", path, e);
        }
    }
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Handles the --dry-run mode: validates config and shows the tree that would be walked
async fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== catwalk Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Menu: {}", config.api.menu_url());
    println!("  User agent: {}", config.api.user_agent);
    match config.api.request_timeout_secs {
        Some(secs) => println!("  Request timeout: {}s", secs),
        None => println!("  Request timeout: none"),
    }

    println!("\nCrawler:");
    match config.crawler.max_concurrent_fetches {
        Some(cap) => println!("  Max concurrent fetches: {}", cap),
        None => println!("  Max concurrent fetches: unbounded"),
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nReport:");
    println!(
        "  Slow: status 200 over {}s, top {}",
        config.report.slow_threshold_secs, config.report.slow_limit
    );
    println!("  Errors: status other than 200, top {}", config.report.error_limit);

    println!("\nNotifier:");
    match &config.telegram {
        Some(telegram) => println!("  Telegram chat {}", telegram.chat_id),
        None => println!("  stdout"),
    }

    let client = build_http_client(&config.api)?;
    let roots = fetch_root_categories(&client, &config.api.menu_url()).await?;

    let total = count_nodes(&roots);
    println!("\nCategory tree ({} roots):", roots.len());
    print_tree(roots);

    println!("\n✓ Configuration is valid");
    println!("✓ Would fetch {} categories", total);

    Ok(())
}

/// Prints the tree depth-first, consuming it node by node
fn print_tree(roots: Vec<CategoryNode>) {
    let mut stack: Vec<(CategoryNode, usize)> = roots.into_iter().rev().map(|n| (n, 1)).collect();
    while let Some((mut node, depth)) = stack.pop() {
        println!("{}- {} (id {})", "  ".repeat(depth), node.slug, node.id);
        let children = std::mem::take(&mut node.children);
        stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    println!("Pages:    {}", storage.count_pages()?);
    println!("Requests: {}", storage.count_requests()?);
    println!(
        "Last 24h: {}",
        storage.count_requests_since(&(Utc::now() - chrono::Duration::hours(24)))?
    );
    println!("Dangling: {}", storage.count_dangling_requests()?);

    Ok(())
}

/// Handles the --report-since mode: prints the digest from stored data
fn handle_report_since(config: &Config, since: &str) -> Result<(), Box<dyn std::error::Error>> {
    let since: DateTime<Utc> = DateTime::parse_from_rfc3339(since)
        .map_err(|e| format!("Invalid --report-since timestamp '{}': {}", since, e))?
        .with_timezone(&Utc);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let (_, digest) = report_since(&storage, &since, config);

    match digest {
        Some(text) => println!("{}", text),
        None => println!("No slow or failed requests since {}", since.to_rfc3339()),
    }

    Ok(())
}

/// Handles the main probe run
async fn handle_run(config: Config, no_notify: bool) -> Result<(), Box<dyn std::error::Error>> {
    let telegram = if no_notify { None } else { config.telegram.clone() };
    let coordinator = Coordinator::new(config)?;

    let notifier: Box<dyn Notifier> = match telegram {
        Some(telegram) => Box::new(TelegramNotifier::new(coordinator.client().clone(), &telegram)),
        None => Box::new(StdoutNotifier),
    };

    let cancel = coordinator.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping walk");
            cancel.cancel();
        }
    });

    match coordinator.run(notifier.as_ref()).await {
        Ok(summary) => {
            tracing::info!(
                "Run completed: {} visited, {} persisted, {} network failures, {} slow, {} failed",
                summary.walk.visited,
                summary.walk.persisted,
                summary.walk.network_failures,
                summary.report.slow.len(),
                summary.report.errors.len()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
