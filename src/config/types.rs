use serde::Deserialize;

/// Main configuration structure for condition-corpus
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
}

/// Upstream API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// First listing page of the crawl
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable holding the subscription key
    #[serde(rename = "key-env", default = "default_key_env")]
    pub key_env: String,

    /// Optional dotenv-style file loaded before reading `key_env`
    #[serde(rename = "secrets-file", default)]
    pub secrets_file: Option<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of requests in flight at once
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Minimum time between two request dispatches (milliseconds)
    #[serde(rename = "download-delay")]
    pub download_delay: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Extra attempts for transient failures (429, 5xx, timeouts)
    #[serde(rename = "max-retries", default)]
    pub max_retries: u32,

    /// Delay between retry attempts (milliseconds)
    #[serde(rename = "retry-delay", default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Whether a page whose every child failed still advances to the next page
    #[serde(rename = "advance-when-all-children-fail", default = "default_true")]
    pub advance_when_all_children_fail: bool,

    /// Stop after this many listing pages (0 = unlimited)
    #[serde(rename = "max-pages", default)]
    pub max_pages: u32,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the JSON-lines corpus file
    #[serde(rename = "corpus-path")]
    pub corpus_path: String,

    /// Path to the markdown crawl summary
    #[serde(rename = "summary-path")]
    pub summary_path: String,

    /// Directory receiving one text file per document
    #[serde(rename = "text-dir", default)]
    pub text_dir: Option<String>,

    /// Path to the JSON-lines chunk file written by `--export-chunks`
    #[serde(rename = "chunks-path", default)]
    pub chunks_path: Option<String>,
}

/// Text chunking for the indexing hand-off
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    #[serde(rename = "chunk-size", default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters carried over between neighbouring chunks
    #[serde(rename = "chunk-overlap", default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_key_env() -> String {
    "NHS_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_retry_delay() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}
