//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the incremental catalog crawler.

use anyhow::Context;
use catalog_harvest::config::{load_config, validate, Config, RendererKind};
use catalog_harvest::crawler::{search_page_url, Harvester, SearchRenderer};
use catalog_harvest::output::{generate_summary, print_statistics};
use catalog_harvest::store::{Corpus, SearchPageCache};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Catalog-Harvest: an incremental catalog crawler
///
/// Walks paginated search results, fetches project details and images, and
/// keeps a local JSON corpus that later runs only top up.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version)]
#[command(about = "Incremental catalog crawler with search page cache", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; flags below override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Search URL without the page parameter
    #[arg(long)]
    search_url: Option<String>,

    /// Output directory for the corpus, cache and images
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Number of search pages to walk
    #[arg(long)]
    max_pages: Option<u32>,

    /// Seconds to wait after each search page load
    #[arg(long)]
    page_wait: Option<f64>,

    /// Seconds each worker waits after a project
    #[arg(long)]
    detail_delay: Option<f64>,

    /// Run Chrome headless
    #[arg(long)]
    headless: bool,

    /// Number of detail workers
    #[arg(long)]
    workers: Option<usize>,

    /// Persist the corpus after this many successful projects
    #[arg(long)]
    checkpoint_every: Option<usize>,

    /// How search pages are rendered
    #[arg(long, value_enum)]
    renderer: Option<RendererKind>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate configuration and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Write and show statistics for the existing corpus and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

impl Cli {
    /// Loads the config file (or defaults) and applies flag overrides
    fn resolve_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => Config::default(),
        };

        let crawler = &mut config.crawler;
        if let Some(url) = &self.search_url {
            crawler.search_url = url.clone();
        }
        if let Some(pages) = self.max_pages {
            crawler.max_pages = pages;
        }
        if let Some(secs) = self.page_wait {
            crawler.page_wait_ms = seconds_to_millis(secs);
        }
        if let Some(secs) = self.detail_delay {
            crawler.detail_delay_ms = seconds_to_millis(secs);
        }
        if self.headless {
            crawler.headless = true;
        }
        if let Some(workers) = self.workers {
            crawler.workers = workers;
        }
        if let Some(every) = self.checkpoint_every {
            crawler.checkpoint_every = every;
        }
        if let Some(renderer) = self.renderer {
            crawler.renderer = renderer;
        }
        if let Some(dir) = &self.output_dir {
            config.output.output_dir = dir.clone();
        }

        validate(&config).context("Invalid configuration")?;
        Ok(config)
    }
}

fn seconds_to_millis(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{:#}", e);
            return Err(e);
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows configuration and local state without network I/O
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let output = &config.output;
    let cache = SearchPageCache::load(&output.search_cache_path())?;
    let corpus = Corpus::load(&output.projects_path())?;

    println!("=== Catalog-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Search URL: {}", config.crawler.search_url);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Renderer: {:?}", config.crawler.renderer);
    println!("  Headless: {}", config.crawler.headless);
    println!("  Page wait: {}ms", config.crawler.page_wait_ms);
    println!("  Detail delay: {}ms", config.crawler.detail_delay_ms);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Checkpoint every: {}", config.crawler.checkpoint_every);

    println!("\nOutput:");
    println!("  Directory: {}", output.output_dir.display());
    println!("  Corpus: {} ({} records)", output.projects_path().display(), corpus.len());
    println!(
        "  Search cache: {} ({} pages)",
        output.search_cache_path().display(),
        cache.len()
    );

    let uncached: Vec<String> = (1..=config.crawler.max_pages)
        .map(|page| search_page_url(&config.crawler.search_url, &config.extract.page_param, page))
        .filter(|url| !cache.contains(url))
        .collect();

    let incomplete = corpus.records().iter().filter(|r| r.is_incomplete()).count();

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would render {} of {} search pages ({} cached)",
        uncached.len(),
        config.crawler.max_pages,
        config.crawler.max_pages as usize - uncached.len()
    );
    println!("✓ {} existing records are incomplete and would be re-fetched", incomplete);

    Ok(())
}

/// Handles the --stats mode: summarizes the existing corpus
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Corpus: {}\n", config.output.projects_path().display());

    let summary = generate_summary(&config.output).context("Failed to generate summary")?;
    print_statistics(&summary.statistics);

    println!(
        "\n✓ Summary written to: {}",
        config.output.summary_path().display()
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting harvest: {} search pages, {} workers, output {}",
        config.crawler.max_pages,
        config.crawler.workers,
        config.output.output_dir.display()
    );

    let renderer = SearchRenderer::from_config(&config)
        .await
        .context("Failed to start search page renderer")?;
    let harvester = Harvester::new(config)?;

    let result = harvester.run(&renderer).await;
    renderer.close().await;

    match result {
        Ok(report) => {
            tracing::info!(
                "Harvest completed: {} links, {} dispatched, {} succeeded, {} failed",
                report.links,
                report.dispatched,
                report.succeeded,
                report.failed()
            );
            for (url, reason) in &report.failures {
                tracing::warn!("  failed: {} ({})", url, reason);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
