//! Configuration management for Presswire.
//!
//! Settings are resolved in three layers: built-in defaults, then
//! `~/.config/presswire/config.toml` (or an explicit path), then the
//! `CACHE_TTL`, `HTTP_TIMEOUT`, `HTTP_RETRIES`, `MAX_CACHE_SIZE` and
//! `FEED_URL` environment variables. If the default config file doesn't
//! exist, one with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Press release feed of the City of Cologne.
pub const DEFAULT_FEED_URL: &str =
    "https://www.stadt-koeln.de/externe-dienste/rss/pressemeldungen.xml";

/// Site root used to resolve relative item links.
pub const DEFAULT_BASE_URL: &str = "https://www.stadt-koeln.de";

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed document to ingest
    pub feed_url: String,

    /// Base for relative `<link>` values
    pub base_url: String,

    /// Seconds a snapshot stays fresh (default: 300)
    pub cache_ttl_secs: u64,

    /// Per-request HTTP timeout in seconds (default: 8)
    pub http_timeout_secs: u64,

    /// Total fetch attempts per refresh, first try included (default: 3)
    pub http_retries: u32,

    /// Backoff before the second attempt; doubles after each failure (default: 1000)
    pub retry_base_delay_ms: u64,

    /// Items kept from one feed document (default: 1000)
    pub max_cache_size: usize,

    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: 300,
            http_timeout_secs: 8,
            http_retries: 3,
            retry_base_delay_ms: 1000,
            max_cache_size: 1000,
            user_agent: concat!("presswire/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, then apply environment overrides.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Self::default().finish();
        }

        Self::from_file(&config_path)?.finish()
    }

    /// Load configuration from an explicit file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::from_file(path)?.finish()
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn finish(mut self) -> Result<Self, ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())?;
        self.validate()?;
        Ok(self)
    }

    /// Override fields from environment-style variables.
    ///
    /// `lookup` resolves a variable name; blank values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CACHE_TTL") {
            self.cache_ttl_secs = parse_env("CACHE_TTL", &v)?;
        }
        if let Some(v) = get("HTTP_TIMEOUT") {
            self.http_timeout_secs = parse_env("HTTP_TIMEOUT", &v)?;
        }
        if let Some(v) = get("HTTP_RETRIES") {
            self.http_retries = parse_env("HTTP_RETRIES", &v)?;
        }
        if let Some(v) = get("MAX_CACHE_SIZE") {
            self.max_cache_size = parse_env("MAX_CACHE_SIZE", &v)?;
        }
        if let Some(v) = get("FEED_URL") {
            self.feed_url = v.trim().to_string();
        }

        Ok(())
    }

    /// Reject settings the rest of the crate cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_retries == 0 {
            return Err(ConfigError::Invalid("http_retries must be at least 1".into()));
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http_timeout_secs must be at least 1".into(),
            ));
        }
        if self.max_cache_size == 0 {
            return Err(ConfigError::Invalid("max_cache_size must be at least 1".into()));
        }
        Url::parse(&self.feed_url)
            .map_err(|e| ConfigError::Invalid(format!("feed_url {}: {}", self.feed_url, e)))?;
        Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid(format!("base_url {}: {}", self.base_url, e)))?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// Get the default config file path: `~/.config/presswire/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("presswire").join("config.toml"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# Presswire Configuration
#
# Every value below can also be overridden from the environment:
#   CACHE_TTL, HTTP_TIMEOUT, HTTP_RETRIES, MAX_CACHE_SIZE, FEED_URL

# Feed to ingest
feed_url = "https://www.stadt-koeln.de/externe-dienste/rss/pressemeldungen.xml"

# Relative item links are resolved against this URL
base_url = "https://www.stadt-koeln.de"

# Seconds before cached data is refreshed
cache_ttl_secs = 300

# HTTP request timeout in seconds
http_timeout_secs = 8

# Fetch attempts per refresh (including the first)
http_retries = 3

# Delay before the first retry in milliseconds, doubled on each further retry
retry_base_delay_ms = 1000

# Maximum number of items kept from one feed document
max_cache_size = 1000
"##
        .to_string()
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
