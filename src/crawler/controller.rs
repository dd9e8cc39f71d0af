//! Pagination state machine
//!
//! The controller owns every in-progress listing page, keyed by [`PageId`].
//! It never performs I/O: the coordinator feeds it one [`Resolution`] at a
//! time and carries out the [`Action`]s it returns. Because resolutions are
//! handled to completion one after another, the per-page reorder buffers
//! need no locking.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::FetchOutcome;
use crate::extract::extract;
use crate::listing::{parse_page_links, partition_links};
use crate::output::{CrawlStats, ExtractedDocument, RawDocument};
use crate::queue::ReorderBuffer;
use crate::state::PagePhase;
use crate::CorpusError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// Identifies one listing page for the lifetime of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

impl PageId {
    /// The 1-based ordinal of this page within the crawl
    pub fn ordinal(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// The listing page itself
    Listing,

    /// A condition page at `position` within its listing
    Child { position: usize },
}

/// Routes a resolution back to its page and slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTag {
    pub page: PageId,
    pub kind: RequestKind,
}

/// A request the controller wants issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub tag: RequestTag,
    pub url: String,

    /// Lower values are dispatched first
    pub priority: u32,
}

/// A completed request, successful or not
#[derive(Debug, Clone)]
pub struct Resolution {
    pub tag: RequestTag,
    pub url: String,
    pub outcome: FetchOutcome,
    pub retrieved_at: DateTime<Utc>,
}

/// How the crawl ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The last page had no next-page link (or the page limit was reached)
    Completed,

    /// A listing page failed and pagination cannot continue
    Failed { url: String, reason: String },
}

impl CrawlOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Work the coordinator must carry out
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Queue this request
    Request(RequestSpec),

    /// Hand this document to the sink
    Emit(ExtractedDocument),

    /// No more pages will be requested
    Finished(CrawlOutcome),
}

/// Pagination policy knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlPolicy {
    /// Advance past a page whose every child failed to fetch
    pub advance_when_all_children_fail: bool,

    /// Stop after this many listing pages (0 = unlimited)
    pub max_pages: u32,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            advance_when_all_children_fail: true,
            max_pages: 0,
        }
    }
}

impl From<&CrawlerConfig> for CrawlPolicy {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            advance_when_all_children_fail: config.advance_when_all_children_fail,
            max_pages: config.max_pages,
        }
    }
}

/// Arena entry for one listing page
#[derive(Debug)]
struct PageEntry {
    url: String,
    phase: PagePhase,
    buffer: Option<ReorderBuffer<ExtractedDocument>>,
    next_page_url: Option<String>,
    children: usize,
    failed_children: usize,
}

/// Drives listing pages through their [`PagePhase`]s
#[derive(Debug)]
pub struct PageController {
    pages: HashMap<PageId, PageEntry>,
    next_id: u64,
    policy: CrawlPolicy,
    stats: CrawlStats,
    outcome: Option<CrawlOutcome>,
}

impl PageController {
    /// Creates a controller with no pages
    pub fn new(policy: CrawlPolicy) -> Self {
        Self {
            pages: HashMap::new(),
            next_id: 1,
            policy,
            stats: CrawlStats::new(),
            outcome: None,
        }
    }

    /// Opens the first listing page
    pub fn start(&mut self, url: &str) -> Vec<Action> {
        vec![self.open_page(url.to_string())]
    }

    /// Processes one resolution and returns the follow-up work
    ///
    /// Per-document problems (failed fetches, unextractable payloads) are
    /// absorbed here. Only buffer violations, unknown pages and invalid
    /// phase transitions are returned as errors; all of them indicate bugs.
    pub fn handle(&mut self, resolution: Resolution) -> Result<Vec<Action>, CorpusError> {
        let page = resolution.tag.page;
        if !self.pages.contains_key(&page) {
            tracing::error!("Resolution for unknown page {} ({})", page, resolution.url);
            return Err(CorpusError::UnknownPage(page));
        }

        match resolution.tag.kind {
            RequestKind::Listing => self.on_listing(page, resolution),
            RequestKind::Child { position } => self.on_child(page, position, resolution),
        }
    }

    /// Returns true once the crawl has a final outcome
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// The final outcome, if reached
    pub fn outcome(&self) -> Option<&CrawlOutcome> {
        self.outcome.as_ref()
    }

    /// Counters accumulated so far
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Current phase of a page still held in the arena
    pub fn phase(&self, page: PageId) -> Option<PagePhase> {
        self.pages.get(&page).map(|entry| entry.phase)
    }

    /// Number of pages still held in the arena
    pub fn active_pages(&self) -> usize {
        self.pages.len()
    }

    fn open_page(&mut self, url: String) -> Action {
        let page = PageId(self.next_id);
        self.next_id += 1;
        self.stats.pages_requested += 1;

        tracing::info!("Requesting listing page {}: {}", page, url);
        self.pages.insert(
            page,
            PageEntry {
                url: url.clone(),
                phase: PagePhase::Requesting,
                buffer: None,
                next_page_url: None,
                children: 0,
                failed_children: 0,
            },
        );

        Action::Request(RequestSpec {
            tag: RequestTag {
                page,
                kind: RequestKind::Listing,
            },
            url,
            priority: 0,
        })
    }

    fn on_listing(
        &mut self,
        page: PageId,
        resolution: Resolution,
    ) -> Result<Vec<Action>, CorpusError> {
        self.transition(page, PagePhase::ParsingLinks)?;
        let mut actions = Vec::new();

        let body = match resolution.outcome {
            FetchOutcome::Response { status, body } if (200..300).contains(&status) => body,
            FetchOutcome::Response { status, .. } => {
                self.fail_page(page, format!("HTTP {}", status), &mut actions)?;
                return Ok(actions);
            }
            FetchOutcome::Failed { error } => {
                self.fail_page(page, error, &mut actions)?;
                return Ok(actions);
            }
        };

        let listing = match Url::parse(&resolution.url)
            .map_err(|e| e.to_string())
            .and_then(|base| parse_page_links(&body, &base).map_err(|e| e.to_string()))
        {
            Ok(links) => partition_links(links),
            Err(reason) => {
                self.fail_page(page, reason, &mut actions)?;
                return Ok(actions);
            }
        };

        self.transition(page, PagePhase::AwaitingChildren)?;
        let child_count = listing.children.len();
        tracing::info!(
            "Listing page {} declares {} condition pages{}",
            page,
            child_count,
            if listing.next_page.is_some() {
                " and a next page"
            } else {
                ""
            }
        );

        let entry = self.entry_mut(page)?;
        entry.next_page_url = listing.next_page;
        entry.children = child_count;

        if child_count == 0 {
            self.advance(page, &mut actions)?;
            return Ok(actions);
        }

        entry.buffer = Some(ReorderBuffer::new(child_count));
        for child in listing.children {
            actions.push(Action::Request(RequestSpec {
                tag: RequestTag {
                    page,
                    kind: RequestKind::Child {
                        position: child.position,
                    },
                },
                url: child.url,
                priority: u32::try_from(child.position).unwrap_or(u32::MAX),
            }));
        }
        self.stats.children_requested += child_count as u64;

        Ok(actions)
    }

    fn on_child(
        &mut self,
        page: PageId,
        position: usize,
        resolution: Resolution,
    ) -> Result<Vec<Action>, CorpusError> {
        self.transition(page, PagePhase::Draining)?;

        let raw = match resolution.outcome {
            FetchOutcome::Response { status: 200, body } => RawDocument {
                source_url: resolution.url,
                retrieved_at: resolution.retrieved_at,
                raw_payload: body,
                fetch_ok: true,
            },
            FetchOutcome::Response { status, .. } => {
                tracing::info!(
                    "Response code for {} is {}. Skipping...",
                    resolution.url,
                    status
                );
                RawDocument::failed(resolution.url, resolution.retrieved_at)
            }
            FetchOutcome::Failed { error } => {
                tracing::warn!("Request for {} failed: {}", resolution.url, error);
                RawDocument::failed(resolution.url, resolution.retrieved_at)
            }
        };

        let text = if raw.fetch_ok {
            let extraction = extract(&raw.raw_payload);
            if !extraction.ok {
                self.stats.extraction_failures += 1;
                tracing::warn!("Payload from {} is not JSON", raw.source_url);
            }
            extraction.text
        } else {
            self.stats.child_fetch_failures += 1;
            String::new()
        };

        let document = ExtractedDocument {
            source_url: raw.source_url,
            text,
            retrieved_at: raw.retrieved_at,
        };

        let entry = self
            .pages
            .get_mut(&page)
            .ok_or(CorpusError::UnknownPage(page))?;
        if !raw.fetch_ok {
            entry.failed_children += 1;
        }
        let buffer = entry
            .buffer
            .as_mut()
            .ok_or(CorpusError::UnknownPage(page))?;

        if let Err(source) = buffer.insert(position, document) {
            tracing::error!("Reorder buffer violation on page {}: {}", page, source);
            return Err(CorpusError::Buffer { page, source });
        }

        let mut actions = Vec::new();
        for document in buffer.drain() {
            if document.is_empty() {
                self.stats.empty_documents += 1;
                tracing::warn!("Could not extract any text from {}", document.source_url);
            } else {
                self.stats.documents_emitted += 1;
                actions.push(Action::Emit(document));
            }
        }

        if buffer.is_drained_and_complete() {
            self.advance(page, &mut actions)?;
        } else {
            tracing::trace!(
                "Page {}: {} released, {} waiting",
                page,
                buffer.base_index(),
                buffer.pending()
            );
            self.transition(page, PagePhase::AwaitingChildren)?;
        }

        Ok(actions)
    }

    /// Decides what follows a fully drained page
    fn advance(&mut self, page: PageId, actions: &mut Vec<Action>) -> Result<(), CorpusError> {
        self.transition(page, PagePhase::Advancing)?;

        let entry = self.entry_mut(page)?;
        entry.buffer = None;
        let all_failed = entry.children > 0 && entry.failed_children == entry.children;
        let next_page_url = entry.next_page_url.take();

        if all_failed {
            tracing::warn!("Every condition page on listing page {} failed", page);
            if !self.policy.advance_when_all_children_fail {
                return self.fail_page(
                    page,
                    "every condition page request failed".to_string(),
                    actions,
                );
            }
        }

        self.transition(page, PagePhase::Done)?;
        self.pages.remove(&page);
        self.stats.pages_completed += 1;

        let limit_reached =
            self.policy.max_pages > 0 && self.stats.pages_requested >= u64::from(self.policy.max_pages);

        match next_page_url {
            Some(url) if !limit_reached => actions.push(self.open_page(url)),
            Some(url) => {
                tracing::info!("Page limit reached; not requesting {}", url);
                self.finish(CrawlOutcome::Completed, actions);
            }
            None => {
                tracing::info!("Listing page {} has no next page", page);
                self.finish(CrawlOutcome::Completed, actions);
            }
        }

        Ok(())
    }

    fn fail_page(
        &mut self,
        page: PageId,
        reason: String,
        actions: &mut Vec<Action>,
    ) -> Result<(), CorpusError> {
        self.transition(page, PagePhase::Failed)?;
        let url = self
            .pages
            .remove(&page)
            .map(|entry| entry.url)
            .unwrap_or_default();
        self.stats.pages_failed += 1;

        tracing::error!("Listing page {} ({}) failed: {}", page, url, reason);
        self.finish(CrawlOutcome::Failed { url, reason }, actions);
        Ok(())
    }

    fn finish(&mut self, outcome: CrawlOutcome, actions: &mut Vec<Action>) {
        self.outcome = Some(outcome.clone());
        actions.push(Action::Finished(outcome));
    }

    fn transition(&mut self, page: PageId, to: PagePhase) -> Result<(), CorpusError> {
        let entry = self.entry_mut(page)?;
        let from = entry.phase;
        if !from.can_transition_to(to) {
            tracing::error!("Invalid phase transition on page {}: {} -> {}", page, from, to);
            return Err(CorpusError::InvalidTransition { page, from, to });
        }

        tracing::trace!("Page {}: {} -> {}", page, from, to);
        entry.phase = to;
        Ok(())
    }

    fn entry_mut(&mut self, page: PageId) -> Result<&mut PageEntry, CorpusError> {
        self.pages
            .get_mut(&page)
            .ok_or(CorpusError::UnknownPage(page))
    }
}
