//! Configuration management.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `SCHOLAI_*` environment variables (`__` separates sections, e.g.
//! `SCHOLAI_PARSER__API_KEY`).
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [ranking]
//! path = "./ccfrank.yml"
//!
//! [endpoints]
//! preprint_search = "https://papers.cool/arxiv/search/feed"
//! venue_search = "https://papers.cool/venue/search/feed"
//! publication_search = "https://dblp.org/search/publ/api"
//!
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//!
//! [parser]
//! api_key = "llx-..."
//! base_url = "https://api.cloud.llamaindex.ai"
//! poll_interval_ms = 1000
//! max_poll_interval_ms = 10000
//! backoff_multiplier = 1.5
//! max_attempts = 600
//! deadline_secs = 1800
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::PollConfig;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SCHOLAI";

/// Conventional credential variable for the remote parsing service
pub const PARSER_KEY_ENV: &str = "LLAMA_CLOUD_API_KEY";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub endpoints: EndpointConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub parser: ParserConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where downloaded documents live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// CCF ranking table location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_ranking_path")]
    pub path: PathBuf,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            path: default_ranking_path(),
        }
    }
}

fn default_ranking_path() -> PathBuf {
    PathBuf::from("./ccfrank.yml")
}

/// Remote search surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_preprint_search")]
    pub preprint_search: String,

    #[serde(default = "default_venue_search")]
    pub venue_search: String,

    #[serde(default = "default_publication_search")]
    pub publication_search: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            preprint_search: default_preprint_search(),
            venue_search: default_venue_search(),
            publication_search: default_publication_search(),
        }
    }
}

fn default_preprint_search() -> String {
    "https://papers.cool/arxiv/search/feed".to_string()
}

fn default_venue_search() -> String {
    "https://papers.cool/venue/search/feed".to_string()
}

fn default_publication_search() -> String {
    "https://dblp.org/search/publ/api".to_string()
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Remote document parsing service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Bearer credential. When unset, documents are extracted locally.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_parser_url")]
    pub base_url: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_poll_interval")]
    pub max_poll_interval_ms: u64,

    #[serde(default = "default_backoff")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Overall budget for one job; `None` means only `max_attempts` bounds it
    #[serde(default = "default_deadline")]
    pub deadline_secs: Option<u64>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_parser_url(),
            poll_interval_ms: default_poll_interval(),
            max_poll_interval_ms: default_max_poll_interval(),
            backoff_multiplier: default_backoff(),
            max_attempts: default_max_attempts(),
            deadline_secs: default_deadline(),
        }
    }
}

impl ParserConfig {
    /// Credential, if one is configured and non-blank
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Polling policy for remote jobs
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_interval: Duration::from_millis(self.max_poll_interval_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_attempts: self.max_attempts,
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }
}

fn default_parser_url() -> String {
    "https://api.cloud.llamaindex.ai".to_string()
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_max_poll_interval() -> u64 {
    10_000
}

fn default_backoff() -> f64 {
    1.5
}

fn default_max_attempts() -> u32 {
    600
}

fn default_deadline() -> Option<u64> {
    Some(1800)
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `"json"` for structured output, anything else for plain text
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Look for a config file in the working directory, then the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("scholai.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("scholai").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__"),
    );

    let mut config: Config = builder.build()?.try_deserialize()?;

    // The credential is read once here and handed to the extraction factory
    if config.parser.credential().is_none() {
        config.parser.api_key = std::env::var(PARSER_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
    }

    Ok(config)
}

/// Write a configuration as TOML
pub fn save_config(config: &Config, path: &Path) -> Result<(), ConfigFileError> {
    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
    }

    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}
