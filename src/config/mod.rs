//! Configuration module for condition-corpus
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and resolving the API subscription key.
//!
//! # Example
//!
//! ```no_run
//! use condition_corpus::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("corpus.toml")).unwrap();
//! println!("Dispatch delay: {}ms", config.crawler.download_delay);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, ChunkingConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, resolve_api_key};
