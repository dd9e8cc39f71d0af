//! condition-corpus main entry point
//!
//! This is the command-line interface for the condition-corpus crawler.

use anyhow::{bail, Context};
use clap::Parser;
use condition_corpus::chunk::export_chunks;
use condition_corpus::config::{load_config_with_hash, resolve_api_key, Config};
use condition_corpus::crawler::crawl;
use condition_corpus::output::{generate_markdown_summary, print_statistics, CrawlSummary};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// condition-corpus: an ordered crawler for a paginated conditions API
///
/// Pages through the condition listing, fetches every condition page,
/// extracts plain text and writes a JSON-lines corpus in listing order,
/// ready for chunking and indexing.
#[derive(Parser, Debug)]
#[command(name = "condition-corpus")]
#[command(version)]
#[command(about = "An ordered crawler for a paginated conditions API", long_about = None)]
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

    /// Validate config and credentials without crawling
    #[arg(long, conflicts_with = "export_chunks")]
    dry_run: bool,

    /// Split an existing corpus into chunks and exit
    #[arg(long, conflicts_with = "dry_run")]
    export_chunks: bool,

    /// Start from this listing URL instead of the configured base URL
    #[arg(long, value_name = "URL")]
    start_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, cli.start_url.as_deref())
    } else if cli.export_chunks {
        handle_export_chunks(&config)
    } else {
        handle_crawl(config, &config_hash, cli.start_url.as_deref()).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("condition_corpus=info,warn"),
            1 => EnvFilter::new("condition_corpus=debug,info"),
            2 => EnvFilter::new("condition_corpus=trace,debug"),
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
fn handle_dry_run(config: &Config, start_url: Option<&str>) -> anyhow::Result<()> {
    println!("=== condition-corpus Dry Run ===\n");

    println!("API:");
    println!("  Start URL: {}", start_url.unwrap_or(&config.api.base_url));
    println!("  Key variable: {}", config.api.key_env);
    if let Some(secrets) = &config.api.secrets_file {
        println!("  Secrets file: {}", secrets);
    }

    println!("\nCrawler Configuration:");
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Download delay: {}ms", config.crawler.download_delay);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!(
        "  Retries: {} ({}ms apart)",
        config.crawler.max_retries, config.crawler.retry_delay
    );
    println!(
        "  Advance when all children fail: {}",
        config.crawler.advance_when_all_children_fail
    );
    match config.crawler.max_pages {
        0 => println!("  Max pages: unlimited"),
        n => println!("  Max pages: {}", n),
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Corpus: {}", config.output.corpus_path);
    println!("  Summary: {}", config.output.summary_path);
    if let Some(dir) = &config.output.text_dir {
        println!("  Text directory: {}", dir);
    }
    if let Some(chunks) = &config.output.chunks_path {
        println!(
            "  Chunks: {} (size {}, overlap {})",
            chunks, config.chunking.chunk_size, config.chunking.chunk_overlap
        );
    }

    resolve_api_key(&config.api).context("API key check failed")?;

    println!("\n✓ Configuration is valid");
    println!("✓ API key found");

    Ok(())
}

/// Handles the --export-chunks mode: splits the existing corpus
fn handle_export_chunks(config: &Config) -> anyhow::Result<()> {
    let Some(chunks_path) = &config.output.chunks_path else {
        bail!("--export-chunks needs output.chunks-path in the configuration");
    };

    println!("=== Exporting Chunks ===\n");
    println!("Corpus: {}", config.output.corpus_path);
    println!("Output: {}", chunks_path);
    println!();

    let written = export_chunks(
        Path::new(&config.output.corpus_path),
        Path::new(chunks_path),
        &config.chunking,
    )?;

    println!("✓ {} chunks exported to: {}", written, chunks_path);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: &str,
    start_url: Option<&str>,
) -> anyhow::Result<()> {
    let start = start_url
        .map(str::to_string)
        .unwrap_or_else(|| config.api.base_url.clone());
    let summary_path = PathBuf::from(&config.output.summary_path);

    tracing::info!(
        "Crawling {} with up to {} concurrent requests, {}ms apart",
        start,
        config.crawler.max_concurrent_requests,
        config.crawler.download_delay
    );

    let report = crawl(config, Some(start.as_str())).await.context("Crawl failed")?;

    print_statistics(&report.stats);

    let summary = CrawlSummary::from_report(&report, &start, config_hash);
    generate_markdown_summary(&summary, &summary_path)?;
    println!("\n✓ Summary written to: {}", summary_path.display());

    if !report.is_success() {
        bail!("Crawl halted before the last listing page");
    }

    Ok(())
}
