//! condition-corpus: an ordered corpus crawler for health-condition pages
//!
//! This crate walks a rate-limited, paginated conditions API, fetches every
//! condition page a listing declares, extracts plain text from the nested
//! JSON payloads, and hands the documents to a sink in the exact order the
//! listing declared them, however the responses happen to arrive.

pub mod chunk;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod listing;
pub mod output;
pub mod queue;
pub mod state;

use thiserror::Error;

/// Main error type for condition-corpus operations
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Reorder buffer violation on page {page}: {source}")]
    Buffer {
        page: crawler::PageId,
        source: queue::BufferError,
    },

    #[error("Response for unknown page {0}")]
    UnknownPage(crawler::PageId),

    #[error("Invalid phase transition on page {page}: {from} -> {to}")]
    InvalidTransition {
        page: crawler::PageId,
        from: state::PagePhase,
        to: state::PagePhase,
    },

    #[error("Crawl halted: {0}")]
    Halted(String),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("API key not found: environment variable {0} is unset or empty")]
    MissingCredential(String),
}

/// Result type alias for condition-corpus operations
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport};
pub use extract::{extract, Extraction, SchemaVariant};
pub use output::{CorpusSink, ExtractedDocument};
pub use queue::{BufferError, ReorderBuffer};
pub use state::PagePhase;
