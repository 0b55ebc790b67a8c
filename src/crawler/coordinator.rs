//! Harvest coordinator - merge and concurrency engine
//!
//! This module ties the pipeline together:
//! - Collecting project links through the search page cache
//! - Diffing them against the persisted corpus to build the work list
//! - Fetching details and images on a bounded pool of workers
//! - Applying results from a single consolidation loop with periodic checkpoints
//!
//! Workers never touch the corpus. They send one outcome per URL over a channel
//! and the consolidation loop is the only writer. New records are appended in
//! completion order, so their position varies between runs; consumers key on
//! the project URL.

use crate::config::{Config, ExtractConfig};
use crate::crawler::extractor::fetch_project;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::images::ImageMaterializer;
use crate::crawler::links::{collect_project_links, CollectStats};
use crate::crawler::renderer::PageRenderer;
use crate::store::{Corpus, Placement, ProjectRecord, SearchPageCache};
use crate::{HarvestError, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// What one harvest run did
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Search page statistics; default when links were supplied directly
    pub collect: CollectStats,

    /// Unique project links considered
    pub links: usize,

    /// Links that were missing or incomplete and got dispatched
    pub dispatched: usize,

    pub succeeded: usize,

    /// URL and reason for each failed work item
    pub failures: Vec<(String, String)>,

    /// Number of corpus snapshots written, including the final one
    pub checkpoints: usize,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Result of one work item, sent from a worker to the consolidation loop
struct WorkOutcome {
    url: String,
    result: Result<ProjectRecord>,
}

/// Shared, read-only state for detail workers
struct Worker {
    client: Client,
    materializer: ImageMaterializer,
    extract: ExtractConfig,
    page_timeout: Duration,
    delay: Duration,
}

impl Worker {
    /// Extracts the record, then materializes its images
    async fn harvest(&self, url: &str) -> Result<ProjectRecord> {
        let mut record = fetch_project(&self.client, url, &self.extract, self.page_timeout).await?;
        record.local_images = self
            .materializer
            .materialize(&record.title, &record.images)
            .await?;
        Ok(record)
    }
}

/// Main harvest coordinator
pub struct Harvester {
    config: Arc<Config>,
    worker: Arc<Worker>,
}

impl Harvester {
    /// Creates a harvester with an HTTP client built from `config.http`
    pub fn new(config: Config) -> Result<Self> {
        let client = build_http_client(&config.http)?;
        Ok(Self::with_client(config, client))
    }

    /// Creates a harvester that shares an existing HTTP client
    pub fn with_client(config: Config, client: Client) -> Self {
        let materializer = ImageMaterializer::new(
            client.clone(),
            config.output.output_dir.clone(),
            Duration::from_secs(config.http.image_timeout_secs),
            config.extract.default_image_extension.clone(),
        );

        let worker = Worker {
            client,
            materializer,
            extract: config.extract.clone(),
            page_timeout: Duration::from_secs(config.http.page_timeout_secs),
            delay: Duration::from_millis(config.crawler.detail_delay_ms),
        };

        Self {
            config: Arc::new(config),
            worker: Arc::new(worker),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the whole pipeline: collect links, then merge them into the corpus
    pub async fn run<R>(&self, renderer: &R) -> Result<RunReport>
    where
        R: PageRenderer,
    {
        let output = &self.config.output;
        std::fs::create_dir_all(&output.output_dir).map_err(|source| HarvestError::Persist {
            path: output.output_dir.clone(),
            source,
        })?;

        tracing::info!("Collecting project links (with search page cache)");
        let mut cache = SearchPageCache::load(&output.search_cache_path())?;
        let (links, collect) = collect_project_links(renderer, &mut cache, &self.config).await?;
        tracing::info!(
            "Collected {} unique project links ({} cached pages, {} rendered, {} failed, {} empty)",
            links.len(),
            collect.cache_hits,
            collect.pages_rendered,
            collect.pages_failed,
            collect.pages_empty
        );

        let mut report = self.merge(&links).await?;
        report.collect = collect;
        Ok(report)
    }

    /// Fetches every link that is missing from or incomplete in the corpus and persists the result
    ///
    /// Per-URL failures are logged and counted; they never stop sibling workers.
    /// Persistence failures abort the run.
    pub async fn merge(&self, links: &[String]) -> Result<RunReport> {
        let projects_path = self.config.output.projects_path();
        let mut corpus = Corpus::load(&projects_path)?;

        let todo = corpus.todo_list(links.iter().map(String::as_str));
        let mut report = RunReport {
            links: links.len(),
            dispatched: todo.len(),
            ..Default::default()
        };

        if todo.is_empty() {
            tracing::info!("Nothing to update: every project is present and complete");
            return Ok(report);
        }

        tracing::info!(
            "{} of {} projects need fetching ({} workers)",
            todo.len(),
            links.len(),
            self.config.crawler.workers
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = self.dispatch(todo, tx);

        let total = report.dispatched;
        let checkpoint_every = self.config.crawler.checkpoint_every;
        let mut since_checkpoint = 0;
        let start_time = Instant::now();

        while let Some(WorkOutcome { url, result }) = rx.recv().await {
            let done = report.succeeded + report.failed() + 1;

            match result {
                Ok(record) => {
                    let images = record.local_images.len();
                    let placement = corpus.upsert(record);
                    report.succeeded += 1;
                    since_checkpoint += 1;

                    let action = match placement {
                        Placement::Replaced(_) => "updated",
                        Placement::Appended(_) => "added",
                    };
                    tracing::info!(
                        "[{}/{}] {} {} ({} images)",
                        done,
                        total,
                        action,
                        url,
                        images
                    );

                    if since_checkpoint >= checkpoint_every {
                        corpus.save(&projects_path)?;
                        report.checkpoints += 1;
                        since_checkpoint = 0;
                        tracing::debug!("Checkpoint: {} records saved", corpus.len());
                    }
                }
                Err(e) if !e.is_transient() => {
                    tracing::error!("[{}/{}] Fatal error on {}: {}", done, total, url, e);
                    tasks.abort_all();
                    if let Err(save_err) = corpus.save(&projects_path) {
                        tracing::error!("Could not save corpus before aborting: {}", save_err);
                    }
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("[{}/{}] Failed {}: {}", done, total, url, e);
                    report.failures.push((url, e.to_string()));
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Detail worker did not finish: {}", e);
            }
        }

        corpus.save(&projects_path)?;
        report.checkpoints += 1;

        tracing::info!(
            "Merge completed: {} succeeded, {} failed, {} records in corpus, {:?}",
            report.succeeded,
            report.failed(),
            corpus.len(),
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Spawns one task per URL; a semaphore keeps at most `workers` of them active
    fn dispatch(
        &self,
        todo: Vec<String>,
        tx: mpsc::UnboundedSender<WorkOutcome>,
    ) -> JoinSet<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.crawler.workers));
        let mut tasks = JoinSet::new();

        for url in todo {
            let semaphore = Arc::clone(&semaphore);
            let worker = Arc::clone(&self.worker);
            let tx = tx.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                let result = worker.harvest(&url).await;
                if !worker.delay.is_zero() {
                    tokio::time::sleep(worker.delay).await;
                }

                // receiver only goes away when the run is aborting
                let _ = tx.send(WorkOutcome { url, result });
            });
        }

        tasks
    }
}

/// Runs the main harvest operation with the given renderer
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::Config;
/// use catalog_harvest::crawler::{run_harvest, SearchRenderer};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let renderer = SearchRenderer::from_config(&config).await?;
/// let report = run_harvest(config, &renderer).await?;
/// println!("{} projects fetched", report.succeeded);
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest<R>(config: Config, renderer: &R) -> Result<RunReport>
where
    R: PageRenderer,
{
    let harvester = Harvester::new(config)?;
    harvester.run(renderer).await
}
