//! Output module for finished documents and crawl reports
//!
//! This module handles:
//! - The sink contract for finished documents, plus file-backed sinks
//! - Recording crawl statistics
//! - Generating markdown summaries of crawl results

mod jsonl;
mod markdown;
pub mod stats;
mod text_dir;
mod traits;

pub use jsonl::{read_corpus, JsonlSink};
pub use markdown::{format_markdown_summary, generate_markdown_summary, CrawlSummary};
pub use stats::{print_statistics, CrawlStats};
pub use text_dir::{file_stem, TextDirSink};
pub use traits::{CorpusSink, ExtractedDocument, MultiSink, OutputError, OutputResult};

pub(crate) use traits::RawDocument;
