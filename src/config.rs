use crate::indexing::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Search engine connection
    #[serde(default)]
    pub meilisearch: MeilisearchConfig,

    /// Reindex batching and retry behaviour
    #[serde(default)]
    pub indexing: IndexingConfig,

    /// Query defaults
    #[serde(default)]
    pub search: QueryConfig,

    /// Relational source
    #[serde(default)]
    pub source: SourceConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("MANUSCRIPT_SEARCH_CONFIG")
            .unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: MANUSCRIPT_SEARCH_)
            .add_source(
                config::Environment::with_prefix("MANUSCRIPT_SEARCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeilisearchConfig {
    /// Base URL of the Meilisearch instance
    #[serde(default = "default_meilisearch_url")]
    pub url: String,

    /// API key, takes precedence over `api_key_env`
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Prepended to every index uid
    #[serde(default)]
    pub index_prefix: String,

    /// HTTP timeout for engine calls (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Serve from the in-process engine instead of a Meilisearch instance
    #[serde(default)]
    pub in_memory: bool,
}

impl MeilisearchConfig {
    /// Resolve the API key from the config or the named environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| {
                self.api_key_env
                    .as_deref()
                    .and_then(|name| std::env::var(name).ok())
                    .filter(|key| !key.is_empty())
            })
    }
}

impl Default for MeilisearchConfig {
    fn default() -> Self {
        Self {
            url: default_meilisearch_url(),
            api_key: None,
            api_key_env: None,
            index_prefix: String::new(),
            timeout_secs: default_timeout(),
            in_memory: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Records fetched from the source per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts per batch write before the run fails
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: usize,

    /// First backoff delay (milliseconds)
    #[serde(default = "default_retry_initial_delay")]
    pub retry_initial_delay_ms: u64,

    /// Backoff cap (milliseconds)
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_retry_factor")]
    pub retry_factor: f64,

    /// Seconds a finished admin task stays pollable
    #[serde(default = "default_task_retention")]
    pub task_retention_secs: u64,
}

impl IndexingConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            factor: self.retry_factor,
            max_retries: Some(self.max_write_attempts.max(1)),
        }
    }

    pub fn task_retention(&self) -> Duration {
        Duration::from_secs(self.task_retention_secs)
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_write_attempts: default_max_write_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
            retry_factor: default_retry_factor(),
            task_retention_secs: default_task_retention(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size when the request gives none
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Upper bound for the page size
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    /// JSON catalogue export read by the bundled record source
    pub catalogue_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: default_true(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_meilisearch_url() -> String {
    "http://localhost:7700".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_batch_size() -> usize {
    500
}

fn default_max_write_attempts() -> usize {
    3
}

fn default_retry_initial_delay() -> u64 {
    200
}

fn default_retry_max_delay() -> u64 {
    5_000
}

fn default_retry_factor() -> f64 {
    2.0
}

fn default_task_retention() -> u64 {
    3600
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "manuscript-search".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.indexing.batch_size, 500);
        assert_eq!(config.search.default_limit, 20);
        assert_eq!(config.search.max_limit, 100);
        assert_eq!(config.meilisearch.url, "http://localhost:7700");
        assert!(config.observability.prometheus_enabled);
    }

    #[test]
    fn test_retry_config_from_indexing() {
        let indexing = IndexingConfig {
            max_write_attempts: 0,
            ..Default::default()
        };
        let retry = indexing.retry_config();
        assert_eq!(retry.max_retries, Some(1));
        assert_eq!(retry.initial_delay, Duration::from_millis(200));
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.indexing.batch_size, 500);
        assert_eq!(config.indexing.task_retention(), Duration::from_secs(3600));
        assert_eq!(config.meilisearch.api_key_env.as_deref(), Some("MEILISEARCH_API_KEY"));
    }

    #[test]
    fn test_api_key_prefers_explicit_value() {
        let config = MeilisearchConfig {
            api_key: Some("explicit".to_string()),
            api_key_env: Some("MANUSCRIPT_SEARCH_TEST_UNSET_KEY".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_api_key().as_deref(), Some("explicit"));

        let config = MeilisearchConfig {
            api_key: Some(String::new()),
            api_key_env: Some("MANUSCRIPT_SEARCH_TEST_UNSET_KEY".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_api_key(), None);
    }
}
