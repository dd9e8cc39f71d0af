//! Request scheduler and rate limiting
//!
//! This module handles:
//! - Priority queue management for pending requests
//! - Global concurrency limiting via a semaphore
//! - A minimum delay between consecutive dispatches

use crate::config::CrawlerConfig;
use crate::crawler::controller::RequestSpec;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// A request waiting for dispatch
#[derive(Debug, Clone)]
struct PendingRequest {
    spec: RequestSpec,

    /// Insertion order, breaks priority ties
    seq: u64,
}

// Lower priority values (then earlier insertions) are popped first from BinaryHeap
impl Ord for PendingRequest {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .spec
            .priority
            .cmp(&self.spec.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PendingRequest {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for PendingRequest {}

/// A request cleared for dispatch
pub struct ScheduledRequest {
    pub spec: RequestSpec,

    /// Held until the request resolves
    pub permit: OwnedSemaphorePermit,
}

/// Scheduler owns the pending queue and enforces the request budget
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    queue: BinaryHeap<PendingRequest>,
    download_delay: Duration,
    last_dispatch: Option<Instant>,
    next_seq: u64,
}

impl Scheduler {
    /// Creates a scheduler allowing `max_concurrent` requests in flight
    pub fn new(max_concurrent: usize, download_delay: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            queue: BinaryHeap::new(),
            download_delay,
            last_dispatch: None,
            next_seq: 0,
        }
    }

    /// Creates a scheduler from the crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.max_concurrent_requests as usize,
            Duration::from_millis(config.download_delay),
        )
    }

    /// Queues a request
    pub fn enqueue(&mut self, spec: RequestSpec) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(PendingRequest { spec, seq });
    }

    /// Waits until the next request may be dispatched and returns it
    ///
    /// Returns `None` if the queue is empty. Cancel-safe: if the future is
    /// dropped before completing, no request is lost and no permit is held.
    pub async fn next_request(&mut self) -> Option<ScheduledRequest> {
        if self.queue.is_empty() {
            return None;
        }

        if let Some(ready_at) = self.ready_at() {
            tokio::time::sleep_until(ready_at).await;
        }

        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        // Nothing above removed from the queue, so it is still non-empty
        let pending = self.queue.pop()?;
        self.last_dispatch = Some(Instant::now());
        tracing::debug!(
            "Dispatching {} (priority {}, {} queued)",
            pending.spec.url,
            pending.spec.priority,
            self.queue.len()
        );

        Some(ScheduledRequest {
            spec: pending.spec,
            permit,
        })
    }

    /// Earliest instant the next dispatch is allowed
    fn ready_at(&self) -> Option<Instant> {
        self.last_dispatch
            .map(|last| last + self.download_delay)
            .filter(|ready| *ready > Instant::now())
    }

    /// Returns the number of queued requests
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Permits not currently held by in-flight requests
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::controller::{PageController, RequestKind, RequestTag};

    fn create_test_config() -> CrawlerConfig {
        CrawlerConfig {
            max_concurrent_requests: 2,
            download_delay: 0,
            request_timeout: 30,
            max_retries: 0,
            retry_delay: 5000,
            advance_when_all_children_fail: true,
            max_pages: 0,
        }
    }

    fn spec(tag: RequestTag, position: usize, priority: u32) -> RequestSpec {
        RequestSpec {
            tag: RequestTag {
                page: tag.page,
                kind: RequestKind::Child { position },
            },
            url: format!("https://api.example.com/conditions/{}/", position),
            priority,
        }
    }

    /// A tag for a real page; page ids are only minted by the controller
    fn page_tag() -> RequestTag {
        let mut controller = PageController::new(Default::default());
        match controller.start("https://api.example.com/conditions/").remove(0) {
            crate::crawler::controller::Action::Request(spec) => spec.tag,
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_new_scheduler() {
        let scheduler = Scheduler::from_config(&create_test_config());
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.len(), 0);
        assert_eq!(scheduler.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_empty_queue_returns_none() {
        let mut scheduler = Scheduler::from_config(&create_test_config());
        assert!(scheduler.next_request().await.is_none());
    }

    #[tokio::test]
    async fn test_lower_priority_first_fifo_among_equals() {
        let tag = page_tag();
        let mut scheduler = Scheduler::new(10, Duration::ZERO);
        scheduler.enqueue(spec(tag, 2, 2));
        scheduler.enqueue(spec(tag, 0, 0));
        scheduler.enqueue(spec(tag, 7, 1));
        scheduler.enqueue(spec(tag, 1, 1));

        let mut order = Vec::new();
        while let Some(scheduled) = scheduler.next_request().await {
            if let RequestKind::Child { position } = scheduled.spec.tag.kind {
                order.push(position);
            }
        }

        assert_eq!(order, vec![0, 7, 1, 2]);
    }

    #[tokio::test]
    async fn test_permits_cap_concurrency() {
        let tag = page_tag();
        let mut scheduler = Scheduler::new(1, Duration::ZERO);
        scheduler.enqueue(spec(tag, 0, 0));
        scheduler.enqueue(spec(tag, 1, 1));

        let first = scheduler.next_request().await.unwrap();
        assert_eq!(scheduler.available_permits(), 0);

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), scheduler.next_request()).await;
        assert!(blocked.is_err());
        // The cancelled wait must not lose the request
        assert_eq!(scheduler.len(), 1);

        drop(first);
        let second = scheduler.next_request().await.unwrap();
        assert_eq!(second.spec.tag.kind, RequestKind::Child { position: 1 });
    }

    #[tokio::test]
    async fn test_download_delay_spaces_dispatches() {
        let tag = page_tag();
        let mut scheduler = Scheduler::new(10, Duration::from_millis(80));
        scheduler.enqueue(spec(tag, 0, 0));
        scheduler.enqueue(spec(tag, 1, 1));

        let started = Instant::now();
        let _first = scheduler.next_request().await.unwrap();
        let _second = scheduler.next_request().await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(80));
    }
}
