//! Corpus sink trait and document types
//!
//! This module defines what a finished document looks like and the trait
//! every destination for finished documents implements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A child response exactly as it resolved
///
/// Every child request produces one, including terminal failures, so its
/// reorder slot is always filled. It only lives until extraction; the
/// payload itself is never written to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawDocument {
    pub source_url: String,
    pub retrieved_at: DateTime<Utc>,
    pub raw_payload: String,
    pub fetch_ok: bool,
}

impl RawDocument {
    /// A document for a child that could not be fetched
    pub fn failed(source_url: impl Into<String>, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            source_url: source_url.into(),
            retrieved_at,
            raw_payload: String::new(),
            fetch_ok: false,
        }
    }
}

/// A document after text extraction
///
/// Empty `text` means nothing was extractable. Such documents still occupy
/// their position in the page order but never reach a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub source_url: String,
    pub text: String,
    pub retrieved_at: DateTime<Utc>,
}

impl ExtractedDocument {
    /// Returns true if extraction produced no text
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Destination for finished documents
///
/// Documents arrive in crawl order: page by page, and within a page in the
/// order the listing declared them.
pub trait CorpusSink {
    /// Records one finished, non-empty document
    fn accept(&mut self, document: &ExtractedDocument) -> OutputResult<()>;

    /// Flushes anything buffered; called once when the crawl stops
    fn finish(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

impl CorpusSink for Vec<ExtractedDocument> {
    fn accept(&mut self, document: &ExtractedDocument) -> OutputResult<()> {
        self.push(document.clone());
        Ok(())
    }
}

impl<S: CorpusSink + ?Sized> CorpusSink for Box<S> {
    fn accept(&mut self, document: &ExtractedDocument) -> OutputResult<()> {
        (**self).accept(document)
    }

    fn finish(&mut self) -> OutputResult<()> {
        (**self).finish()
    }
}

/// Forwards every document to several sinks
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn CorpusSink>>,
}

impl MultiSink {
    /// Creates an empty fan-out sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a destination
    pub fn push(&mut self, sink: Box<dyn CorpusSink>) {
        self.sinks.push(sink);
    }

    /// Number of destinations
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if there are no destinations
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl CorpusSink for MultiSink {
    fn accept(&mut self, document: &ExtractedDocument) -> OutputResult<()> {
        for sink in &mut self.sinks {
            sink.accept(document)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        for sink in &mut self.sinks {
            sink.finish()?;
        }
        Ok(())
    }
}
