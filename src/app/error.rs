use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum PresswireError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("Fetch failed after {attempts} attempt(s): {last_error}")]
    Fetch { attempts: u32, last_error: String },

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PresswireError {
    /// Whether a fetch attempt that failed with this error is worth repeating.
    ///
    /// Transport failures, timeouts and non-success statuses are transient.
    /// Parse, lookup and validation failures never are.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::UpstreamStatus(_))
    }
}

pub type Result<T> = std::result::Result<T, PresswireError>;
