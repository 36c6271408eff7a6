//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::error::ScrapeError;
use crate::retry::RetryPolicy;
use crate::session::{ResourceType, SessionBackend};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "REVIEW_SCRAPER_";

/// Application configuration with layered loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Page-fetch engine
    #[serde(default)]
    pub backend: SessionBackend,

    /// Run Chrome without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Resource types suppressed for load speed
    #[serde(default = "default_block_resources")]
    pub block_resources: Vec<ResourceType>,

    /// Lower bound of the random pause before each navigation
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the random pause before each navigation
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_rotate_user_agent")]
    pub rotate_user_agent: bool,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Per-navigation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries per page after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before retry n is `backoff_base_ms * 2^n`
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Page cap per source
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Overall wall-clock budget in seconds; 0 disables it
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Directory for generated output files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_headless() -> bool {
    true
}

fn default_block_resources() -> Vec<ResourceType> {
    vec![ResourceType::Image, ResourceType::Font, ResourceType::Media]
}

fn default_min_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_rotate_user_agent() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_max_pages() -> u32 {
    50
}

fn default_run_timeout_secs() -> u64 {
    1800
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: SessionBackend::Browser,
            headless: default_headless(),
            block_resources: default_block_resources(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            rotate_user_agent: default_rotate_user_agent(),
            proxy: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            max_pages: default_max_pages(),
            run_timeout_secs: default_run_timeout_secs(),
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("review-crawler").join("config.toml");
            if user_config.exists() {
                debug!("Found config in user config directory");
                return Self::from_file(user_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies `REVIEW_SCRAPER_*` environment overrides. Invalid values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Some(delay) = env_parse::<u64>("DELAY") {
            self.min_delay_ms = delay;
            self.max_delay_ms = self.max_delay_ms.max(delay);
        }

        if let Some(timeout) = env_parse("TIMEOUT") {
            self.timeout_secs = timeout;
        }

        if let Some(retries) = env_parse("MAX_RETRIES") {
            self.max_retries = retries;
        }

        if let Some(backend) = env_parse("BACKEND") {
            self.backend = backend;
        }

        if let Ok(proxy) = std::env::var(format!("{}PROXY", ENV_PREFIX)) {
            if !proxy.trim().is_empty() {
                self.proxy = Some(proxy);
            }
        }

        self
    }

    /// Checks cross-field constraints the type system does not.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(ScrapeError::Configuration(format!(
                "min_delay_ms ({}) is greater than max_delay_ms ({})",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        if self.max_pages == 0 {
            return Err(ScrapeError::Configuration("max_pages must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ScrapeError::Configuration("timeout_secs must be at least 1".into()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_base_ms)
    }

    /// Overall run budget, `None` when disabled.
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.run_timeout_secs > 0).then(|| Duration::from_secs(self.run_timeout_secs))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(format!("{}{}", ENV_PREFIX, key)).ok()?.trim().parse().ok()
}
