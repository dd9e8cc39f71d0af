//! Crawler module for the paginated conditions API
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Request scheduling and rate limiting
//! - The per-page state machine that keeps documents in listing order
//! - Overall crawl coordination

mod controller;
mod coordinator;
mod fetcher;
mod scheduler;

pub use controller::{
    Action, CrawlOutcome, CrawlPolicy, PageController, PageId, RequestKind, RequestSpec,
    RequestTag, Resolution,
};
pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use fetcher::{
    build_http_client, fetch_url, user_agent_string, FetchOutcome, RetryPolicy,
    SUBSCRIPTION_KEY_HEADER,
};
pub use scheduler::{ScheduledRequest, Scheduler};

use crate::config::{resolve_api_key, Config};
use crate::output::{JsonlSink, MultiSink, TextDirSink};
use crate::Result;
use std::path::Path;

/// Runs a complete crawl with the sinks named in the configuration
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Resolve the API key
/// 2. Open the JSON-lines corpus (and the text directory, if configured)
/// 3. Page through the listing from `start_url` (or the configured base URL)
/// 4. Flush every sink
///
/// A crawl that halts on a failed listing page still returns `Ok`; check
/// [`CrawlReport::is_success`].
pub async fn crawl(config: Config, start_url: Option<&str>) -> Result<CrawlReport> {
    let api_key = resolve_api_key(&config.api)?;

    let mut sink = MultiSink::new();
    sink.push(Box::new(JsonlSink::create(Path::new(
        &config.output.corpus_path,
    ))?));
    if let Some(dir) = &config.output.text_dir {
        sink.push(Box::new(TextDirSink::create(Path::new(dir))?));
    }

    let start_url = start_url
        .map(str::to_string)
        .unwrap_or_else(|| config.api.base_url.clone());

    let mut coordinator = Coordinator::new(config, &api_key, sink)?;
    coordinator.run_from(&start_url).await
}
