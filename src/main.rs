//! Corpus-Harvest main entry point
//!
//! This is the command-line interface for the Corpus-Harvest news crawler
//! and corpus converter.

use anyhow::{bail, Context};
use clap::Parser;
use corpus_harvest::config::{load_config_with_hash, resolve_path, BatchConfig, Config, TargetConfig};
use corpus_harvest::convert::convert_batch;
use corpus_harvest::crawler::{harvest_target, CrawlEngine, HttpFetcher, SelectorExtractor};
use corpus_harvest::output::{print_conversion_report, print_harvest_summary};
use corpus_harvest::storage::JsonlCorpus;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Corpus-Harvest: a polite news crawler and corpus builder
///
/// Corpus-Harvest crawls news sites through their listing pages and
/// "load more" continuations, extracts article fields and appends
/// normalized records to Bangla and English JSON Lines corpora. It can
/// also convert pre-harvested dumps into the same corpora.
#[derive(Parser, Debug)]
#[command(name = "corpus-harvest")]
#[command(version)]
#[command(about = "A polite news crawler and corpus builder", long_about = None)]
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

    /// Only run the named targets (or batches with --convert)
    #[arg(long, value_name = "NAME", num_args = 1..)]
    only: Vec<String>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "convert")]
    dry_run: bool,

    /// Run the batch converters instead of crawling
    #[arg(long)]
    convert: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.convert {
        let batches = select(&config.batches, &cli.only, |b| &b.name)?;
        handle_convert(&config, &batches, &cli.config)
    } else {
        let targets = select(&config.targets, &cli.only, |t| &t.name)?;
        if cli.dry_run {
            handle_dry_run(&config, &targets, &cli.config)
        } else {
            handle_crawl(&config, &targets, &cli.config).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("corpus_harvest=info,warn"),
            1 => EnvFilter::new("corpus_harvest=debug,info"),
            2 => EnvFilter::new("corpus_harvest=trace,debug"),
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

/// Picks the entries named by `--only`, or all of them
fn select<'a, T>(
    items: &'a [T],
    only: &[String],
    name: impl Fn(&T) -> &String,
) -> anyhow::Result<Vec<&'a T>> {
    if only.is_empty() {
        return Ok(items.iter().collect());
    }

    only.iter()
        .map(|wanted| {
            items
                .iter()
                .find(|item| name(*item) == wanted)
                .with_context(|| format!("No target or batch named '{}'", wanted))
        })
        .collect()
}

fn build_engine(config: &Config) -> anyhow::Result<CrawlEngine> {
    let fetcher = HttpFetcher::new(config).context("Failed to build HTTP client")?;
    Ok(
        CrawlEngine::new(Arc::new(fetcher), Arc::new(SelectorExtractor))
            .with_concurrency(config.crawler.max_concurrent_requests as usize),
    )
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(
    config: &Config,
    targets: &[&TargetConfig],
    config_path: &Path,
) -> anyhow::Result<()> {
    println!("=== Corpus-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!(
        "  Bangla corpus: {}",
        resolve_path(config_path, &config.output.bangla_corpus).display()
    );
    println!(
        "  English corpus: {}",
        resolve_path(config_path, &config.output.english_corpus).display()
    );

    let engine = build_engine(config)?;
    let mut crawl_count = 0;

    println!("\nTargets ({}):", targets.len());
    for target in targets {
        println!(
            "  - {} ({:?}, {}, {})",
            target.name,
            target.corpus,
            target.language,
            target.pagination.name()
        );
        for crawl in engine.plan(target)? {
            crawl_count += 1;
            println!("    * {} (max {} articles)", crawl.name(), crawl.max_articles());
            for url in crawl.start_urls() {
                println!("      {}", url);
            }
        }
    }

    println!("\nBatches ({}):", config.batches.len());
    for batch in &config.batches {
        println!("  - {} ({:?} -> {:?})", batch.name, batch.format, batch.corpus);
        for input in &batch.inputs {
            let path = resolve_path(config_path, input);
            let marker = if path.exists() { "" } else { " (missing)" };
            println!("    * {}{}", path.display(), marker);
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would run {} site crawls", crawl_count);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    targets: &[&TargetConfig],
    config_path: &Path,
) -> anyhow::Result<()> {
    let engine = build_engine(config)?;

    let cancel = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight work");
            cancel.cancel();
        }
    });

    tracing::info!("Starting crawl of {} target(s)", targets.len());

    for target in targets {
        if engine.cancellation_token().is_cancelled() {
            tracing::warn!("Skipping {} (cancelled)", target.name);
            continue;
        }

        let path = resolve_path(config_path, config.output.corpus_path(target.corpus));
        let mut corpus = JsonlCorpus::open(&path);

        match harvest_target(&engine, target, &mut corpus).await {
            Ok(summary) => print_harvest_summary(&summary),
            Err(e) => {
                tracing::error!("Crawl of {} failed: {}", target.name, e);
                return Err(e.into());
            }
        }
    }

    tracing::info!("Crawl completed");
    Ok(())
}

/// Handles the --convert mode: runs the batch converters
fn handle_convert(
    config: &Config,
    batches: &[&BatchConfig],
    config_path: &Path,
) -> anyhow::Result<()> {
    if batches.is_empty() {
        bail!("No [[batch]] entries in configuration");
    }

    for batch in batches {
        let path = resolve_path(config_path, config.output.corpus_path(batch.corpus));
        let mut corpus = JsonlCorpus::open(&path);

        let report = convert_batch(batch, config_path, &mut corpus)
            .with_context(|| format!("Batch {} failed", batch.name))?;
        print_conversion_report(&report);
    }

    Ok(())
}
