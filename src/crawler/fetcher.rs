//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the API client with user agent and credential headers
//! - GET requests that deliver every status code to the caller
//! - Retry logic for transient failures
//! - Error classification

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::{ConfigError, CorpusError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Header carrying the API subscription key
pub const SUBSCRIPTION_KEY_HEADER: &str = "subscription-key";

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server answered, with any status code
    Response {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// No usable response (connection refused, timeout, etc.)
    Failed {
        /// Error description
        error: String,
    },
}

impl FetchOutcome {
    /// Returns the status code if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            Self::Failed { .. } => None,
        }
    }
}

/// How often and how patiently transient failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// No retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::ZERO,
        }
    }
}

impl From<&CrawlerConfig> for RetryPolicy {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay),
        }
    }
}

/// Formats the user agent string: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client for the conditions API
///
/// Every request carries the subscription key and asks for JSON. Redirects
/// are not followed.
///
/// # Example
///
/// ```no_run
/// use condition_corpus::config::UserAgentConfig;
/// use condition_corpus::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "ConditionCorpus".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, "secret", 30).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    api_key: &str,
    timeout_secs: u64,
) -> Result<Client, CorpusError> {
    let mut headers = HeaderMap::new();
    let mut key = HeaderValue::from_str(api_key).map_err(|_| {
        ConfigError::Validation("API key contains characters not valid in a header".into())
    })?;
    key.set_sensitive(true);
    headers.insert(SUBSCRIPTION_KEY_HEADER, key);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let client = Client::builder()
        .user_agent(user_agent_string(config))
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Fetches a URL, retrying transient failures
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx, 3xx, 4xx (not 429) | Delivered as-is |
/// | HTTP 429 / 5xx | Retried, then delivered |
/// | Timeout / connect error | Retried, then `Failed` |
/// | Any other error | Immediate `Failed` |
pub async fn fetch_url(client: &Client, url: &str, retry: &RetryPolicy) -> FetchOutcome {
    let mut attempt = 0;

    loop {
        let outcome = fetch_once(client, url).await;
        let retryable = match &outcome {
            Attempt::Status(status, _) => is_retryable_status(*status),
            Attempt::Transient(_) => true,
            Attempt::Fatal(_) => false,
        };

        if retryable && attempt < retry.max_retries {
            attempt += 1;
            tracing::warn!(
                "Transient failure for {} ({}), retry {}/{} in {:?}",
                url,
                outcome.describe(),
                attempt,
                retry.max_retries,
                retry.delay
            );
            tokio::time::sleep(retry.delay).await;
            continue;
        }

        return outcome.into();
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// One attempt, before the retry decision
enum Attempt {
    Status(StatusCode, String),
    Transient(String),
    Fatal(String),
}

impl Attempt {
    fn describe(&self) -> String {
        match self {
            Self::Status(status, _) => format!("HTTP {}", status.as_u16()),
            Self::Transient(error) | Self::Fatal(error) => error.clone(),
        }
    }
}

impl From<Attempt> for FetchOutcome {
    fn from(attempt: Attempt) -> Self {
        match attempt {
            Attempt::Status(status, body) => FetchOutcome::Response {
                status: status.as_u16(),
                body,
            },
            Attempt::Transient(error) | Attempt::Fatal(error) => FetchOutcome::Failed { error },
        }
    }
}

async fn fetch_once(client: &Client, url: &str) -> Attempt {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            match response.text().await {
                Ok(body) => Attempt::Status(status, body),
                Err(e) if e.is_timeout() => Attempt::Transient("Body read timeout".to_string()),
                Err(e) => Attempt::Fatal(e.to_string()),
            }
        }
        Err(e) => {
            // Classify error
            if e.is_timeout() {
                Attempt::Transient("Request timeout".to_string())
            } else if e.is_connect() {
                Attempt::Transient("Connection refused".to_string())
            } else {
                Attempt::Fatal(e.to_string())
            }
        }
    }
}
