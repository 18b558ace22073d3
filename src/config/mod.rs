//! Configuration management.
//!
//! Configuration is read from a TOML file and overridden by `KAKEN_*`
//! environment variables (nested keys use `__`, e.g. `KAKEN_CACHE__ENABLED=false`).
//!
//! ```toml
//! app_id = "your-application-id"
//!
//! [cache]
//! enabled = true
//! directory = "~/.cache/kaken"
//!
//! [network]
//! timeout_ms = 30000
//! max_retries = 3
//! initial_delay_ms = 1000
//! max_delay_ms = 10000
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::RetryConfig;

/// Default KAKEN project search endpoint
pub const DEFAULT_PROJECTS_ENDPOINT: &str = "https://kaken.nii.ac.jp/opensearch/";
/// Default researcher (NRID) search endpoint
pub const DEFAULT_RESEARCHERS_ENDPOINT: &str = "https://nrid.nii.ac.jp/opensearch/";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// CiNii application id sent as `appid`
    #[serde(default = "default_app_id")]
    pub app_id: Option<String>,

    /// Project search endpoint (XML)
    #[serde(default = "default_projects_endpoint")]
    pub projects_endpoint: String,

    /// Researcher search endpoint (JSON)
    #[serde(default = "default_researchers_endpoint")]
    pub researchers_endpoint: String,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Timeout and retry settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Logging settings (used by the binary)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            projects_endpoint: default_projects_endpoint(),
            researchers_endpoint: default_researchers_endpoint(),
            cache: CacheConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Write this configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
            }
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

fn default_app_id() -> Option<String> {
    std::env::var("KAKEN_APP_ID").ok().filter(|s| !s.is_empty())
}

fn default_projects_endpoint() -> String {
    DEFAULT_PROJECTS_ENDPOINT.to_string()
}

fn default_researchers_endpoint() -> String {
    DEFAULT_RESEARCHERS_ENDPOINT.to_string()
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether responses are cached on disk
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cache directory (defaults to the platform cache dir)
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

impl CacheConfig {
    /// Resolved cache directory
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(default_cache_dir)
    }
}

fn default_true() -> bool {
    true
}

/// Timeout and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single retry delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl NetworkConfig {
    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Retry schedule described by this config
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
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

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error(transparent)]
    Load(#[from] config::ConfigError),
}

/// Load configuration from a TOML file, overridden by `KAKEN_*` environment variables
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("KAKEN")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}

/// Look for `kaken.toml` in the working directory, then `<config dir>/kaken/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("kaken.toml");
    if local.is_file() {
        return Some(local);
    }

    default_config_path().filter(|path| path.is_file())
}

/// `<config dir>/kaken/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kaken").join("config.toml"))
}

/// Platform cache directory for response bodies
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("kaken")
}
