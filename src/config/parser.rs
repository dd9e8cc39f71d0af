use crate::config::types::{ApiConfig, Config};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use condition_corpus::config::load_config;
///
/// let config = load_config(Path::new("corpus.toml")).unwrap();
/// println!("Starting at: {}", config.api.base_url);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded in the crawl summary so runs can be tied to the settings that
/// produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Resolves the API subscription key
///
/// Loads `secrets_file` into the process environment first (if configured
/// and present), then reads the variable named by `key_env`. Variables that
/// are already set are not overridden.
///
/// # Errors
///
/// * `ConfigError::MissingCredential` - the variable is unset or empty
pub fn resolve_api_key(api: &ApiConfig) -> Result<String, ConfigError> {
    if let Some(secrets) = &api.secrets_file {
        match dotenvy::from_filename(secrets) {
            Ok(path) => tracing::debug!("Loaded secrets from {}", path.display()),
            Err(e) if e.not_found() => {
                tracing::debug!("Secrets file {} not found, using environment", secrets)
            }
            Err(e) => {
                return Err(ConfigError::Validation(format!(
                    "Failed to read secrets file '{}': {}",
                    secrets, e
                )))
            }
        }
    }

    match std::env::var(&api.key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ConfigError::MissingCredential(api.key_env.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[api]
base-url = "https://api.example.com/conditions/"
key-env = "TEST_CONDITION_KEY"

[crawler]
max-concurrent-requests = 2
download-delay = 7000
max-retries = 1

[user-agent]
crawler-name = "TestCrawler"
crawler-version = "1.0"
contact-url = "https://example.com/about"
contact-email = "admin@example.com"

[output]
corpus-path = "./corpus.jsonl"
summary-path = "./summary.md"
text-dir = "./docs"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.api.base_url, "https://api.example.com/conditions/");
        assert_eq!(config.api.key_env, "TEST_CONDITION_KEY");
        assert_eq!(config.crawler.max_concurrent_requests, 2);
        assert_eq!(config.crawler.download_delay, 7000);
        assert_eq!(config.output.text_dir.as_deref(), Some("./docs"));
    }

    #[test]
    fn test_defaults() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.request_timeout, 30);
        assert_eq!(config.crawler.retry_delay, 5000);
        assert!(config.crawler.advance_when_all_children_fail);
        assert_eq!(config.crawler.max_pages, 0);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert!(config.output.chunks_path.is_none());
        assert!(config.api.secrets_file.is_none());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/corpus.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID_CONFIG.replace(
            "max-concurrent-requests = 2",
            "max-concurrent-requests = 0",
        );
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_resolve_api_key_from_secrets_file() {
        let secrets = create_temp_config("CONDITION_CORPUS_TEST_KEY_A=from-secrets\n");
        let api = ApiConfig {
            base_url: "https://api.example.com/".to_string(),
            key_env: "CONDITION_CORPUS_TEST_KEY_A".to_string(),
            secrets_file: Some(secrets.path().display().to_string()),
        };

        assert_eq!(resolve_api_key(&api).unwrap(), "from-secrets");
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let api = ApiConfig {
            base_url: "https://api.example.com/".to_string(),
            key_env: "CONDITION_CORPUS_TEST_KEY_UNSET".to_string(),
            secrets_file: Some("/nonexistent/.secrets".to_string()),
        };

        assert!(matches!(
            resolve_api_key(&api),
            Err(ConfigError::MissingCredential(name)) if name == "CONDITION_CORPUS_TEST_KEY_UNSET"
        ));
    }
}
