//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator is the only task that touches the page controller and the
//! sink. It alternates between two things:
//! - Dispatching queued requests as the scheduler allows, each on its own task
//! - Receiving resolutions from those tasks and feeding them to the controller
//!
//! Resolutions arrive in completion order; the controller restores
//! declaration order before anything reaches the sink.

use crate::config::Config;
use crate::crawler::controller::{
    Action, CrawlOutcome, CrawlPolicy, PageController, Resolution,
};
use crate::crawler::fetcher::{build_http_client, fetch_url, RetryPolicy};
use crate::crawler::scheduler::{ScheduledRequest, Scheduler};
use crate::output::{CorpusSink, CrawlStats};
use crate::{CorpusError, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Log progress every this many emitted documents
const PROGRESS_INTERVAL: u64 = 25;

/// Summary of a finished crawl
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: CrawlOutcome,
    pub stats: CrawlStats,
}

impl CrawlReport {
    /// Returns true if pagination ran to its natural end
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Wall-clock duration of the crawl
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// One turn of the driver loop
enum Step {
    Dispatch(ScheduledRequest),
    Resolved(Resolution),
}

/// Main crawler coordinator structure
pub struct Coordinator<S: CorpusSink> {
    config: Arc<Config>,
    client: Client,
    scheduler: Scheduler,
    controller: PageController,
    retry: RetryPolicy,
    sink: S,
    resolutions_tx: mpsc::UnboundedSender<Resolution>,
    resolutions_rx: mpsc::UnboundedReceiver<Resolution>,
    in_flight: usize,
}

impl<S: CorpusSink> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `api_key` - Subscription key sent with every request
    /// * `sink` - Destination for finished documents
    pub fn new(config: Config, api_key: &str, sink: S) -> Result<Self> {
        let client = build_http_client(
            &config.user_agent,
            api_key,
            config.crawler.request_timeout,
        )?;
        let scheduler = Scheduler::from_config(&config.crawler);
        let controller = PageController::new(CrawlPolicy::from(&config.crawler));
        let retry = RetryPolicy::from(&config.crawler);
        let (resolutions_tx, resolutions_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config: Arc::new(config),
            client,
            scheduler,
            controller,
            retry,
            sink,
            resolutions_tx,
            resolutions_rx,
            in_flight: 0,
        })
    }

    /// Crawls from the configured base URL
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let start_url = self.config.api.base_url.clone();
        self.run_from(&start_url).await
    }

    /// Crawls from `start_url`
    ///
    /// The sink is finished whether or not the crawl succeeds, so everything
    /// emitted before a failure is kept.
    pub async fn run_from(&mut self, start_url: &str) -> Result<CrawlReport> {
        let started_at = Utc::now();
        tracing::info!("Starting crawl at {}", start_url);

        let driven = self.drive(start_url).await;
        let finished = self.sink.finish();
        let outcome = driven?;
        finished?;

        let report = CrawlReport {
            started_at,
            finished_at: Utc::now(),
            outcome,
            stats: self.controller.stats().clone(),
        };

        match &report.outcome {
            CrawlOutcome::Completed => tracing::info!(
                "Crawl completed: {} documents from {} listing pages in {}s",
                report.stats.documents_emitted,
                report.stats.pages_completed,
                report.duration().num_seconds()
            ),
            CrawlOutcome::Failed { url, reason } => tracing::error!(
                "Crawl halted at {}: {} ({} documents written)",
                url,
                reason,
                report.stats.documents_emitted
            ),
        }

        Ok(report)
    }

    /// Returns the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the coordinator, returning the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    async fn drive(&mut self, start_url: &str) -> Result<CrawlOutcome> {
        let actions = self.controller.start(start_url);
        self.apply(actions)?;

        loop {
            if let Some(outcome) = self.controller.outcome() {
                if self.in_flight == 0 {
                    return Ok(outcome.clone());
                }
            }

            let step = tokio::select! {
                Some(scheduled) = self.scheduler.next_request(), if !self.scheduler.is_empty() => {
                    Step::Dispatch(scheduled)
                }
                Some(resolution) = self.resolutions_rx.recv(), if self.in_flight > 0 => {
                    Step::Resolved(resolution)
                }
                else => {
                    return Err(CorpusError::Halted(
                        "no requests queued or in flight before the crawl finished".to_string(),
                    ));
                }
            };

            match step {
                Step::Dispatch(scheduled) => self.dispatch(scheduled),
                Step::Resolved(resolution) => {
                    self.in_flight -= 1;
                    let actions = self.controller.handle(resolution)?;
                    self.apply(actions)?;
                }
            }
        }
    }

    /// Carries out the controller's follow-up work
    fn apply(&mut self, actions: Vec<Action>) -> Result<()> {
        for action in actions {
            match action {
                Action::Request(spec) => self.scheduler.enqueue(spec),
                Action::Emit(document) => {
                    self.sink.accept(&document)?;

                    let emitted = self.controller.stats().documents_emitted;
                    if emitted % PROGRESS_INTERVAL == 0 {
                        tracing::info!(
                            "Progress: {} documents written, {} requests queued, {} in flight",
                            emitted,
                            self.scheduler.len(),
                            self.in_flight
                        );
                    }
                }
                Action::Finished(outcome) => {
                    tracing::debug!("Pagination finished: {:?}", outcome);
                }
            }
        }
        Ok(())
    }

    /// Spawns the request; its resolution comes back over the channel
    fn dispatch(&mut self, scheduled: ScheduledRequest) {
        let ScheduledRequest { spec, permit } = scheduled;
        let client = self.client.clone();
        let retry = self.retry;
        let tx = self.resolutions_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let outcome = fetch_url(&client, &spec.url, &retry).await;
            drop(permit);

            let resolution = Resolution {
                tag: spec.tag,
                url: spec.url,
                outcome,
                retrieved_at: Utc::now(),
            };
            if tx.send(resolution).is_err() {
                tracing::debug!("Coordinator gone, dropping resolution");
            }
        });
    }
}

/// Runs a complete crawl into `sink`
///
/// # Example
///
/// ```no_run
/// use condition_corpus::config::load_config;
/// use condition_corpus::crawler::run_crawl;
/// use condition_corpus::ExtractedDocument;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("corpus.toml"))?;
/// let documents: Vec<ExtractedDocument> = Vec::new();
/// let (report, documents) = run_crawl(config, "secret", documents).await?;
/// println!("{} documents, success: {}", documents.len(), report.is_success());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl<S: CorpusSink>(
    config: Config,
    api_key: &str,
    sink: S,
) -> Result<(CrawlReport, S)> {
    let mut coordinator = Coordinator::new(config, api_key, sink)?;
    let report = coordinator.run().await?;
    Ok((report, coordinator.into_sink()))
}
