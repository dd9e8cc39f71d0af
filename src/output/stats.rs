//! Crawl statistics
//!
//! Counters maintained by the crawl controller, printed at the end of a run
//! and rendered into the markdown summary.

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Listing pages requested
    pub pages_requested: u64,

    /// Listing pages that reached `Done`
    pub pages_completed: u64,

    /// Listing pages that ended `Failed`
    pub pages_failed: u64,

    /// Child (condition page) requests issued
    pub children_requested: u64,

    /// Child requests that ended in a non-200 status or network error
    pub child_fetch_failures: u64,

    /// Fetched child payloads that were not JSON
    pub extraction_failures: u64,

    /// Released documents with no text (any cause), dropped before the sink
    pub empty_documents: u64,

    /// Documents handed to the sink
    pub documents_emitted: u64,
}

impl CrawlStats {
    /// Creates an empty statistics record
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents released from reorder buffers, emitted or dropped
    pub fn documents_released(&self) -> u64 {
        self.documents_emitted + self.empty_documents
    }

    /// Percentage of released documents that reached the sink
    pub fn emission_rate(&self) -> f64 {
        let released = self.documents_released();
        if released == 0 {
            return 0.0;
        }
        (self.documents_emitted as f64 / released as f64) * 100.0
    }
}

/// Prints crawl statistics to stdout
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Listing pages:");
    println!("  Requested: {}", stats.pages_requested);
    println!("  Completed: {}", stats.pages_completed);
    println!("  Failed: {}", stats.pages_failed);

    println!("\nCondition pages:");
    println!("  Requested: {}", stats.children_requested);
    println!("  Fetch failures: {}", stats.child_fetch_failures);
    println!("  Extraction failures: {}", stats.extraction_failures);
    println!("  Empty documents dropped: {}", stats.empty_documents);

    println!("\nCorpus:");
    println!("  Documents written: {}", stats.documents_emitted);
    println!("  Emission rate: {:.1}%", stats.emission_rate());
}
