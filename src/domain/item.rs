use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// Origin tag stamped on every item produced by this crate.
pub const SOURCE: &str = "rss:stadt-koeln";

/// Reasons a [`PressItem`] cannot be constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("item id must not be empty")]
    EmptyId,

    #[error("item link is not an absolute http(s) URL: {0}")]
    InvalidLink(String),
}

/// One normalized feed entry.
///
/// `published_at` is `None` when the upstream date was missing or could not be
/// parsed; such items sort after every dated item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressItem {
    pub id: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_guid: Option<String>,
    pub source: String,
}

impl PressItem {
    pub fn builder(id: impl Into<String>) -> PressItemBuilder {
        PressItemBuilder::new(id)
    }

    /// Generate a deterministic ID from a stable upstream key (link or GUID)
    pub fn generate_id(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.trim().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// ID for entries with neither GUID nor link. Unique within one parse only.
    pub fn fallback_id(title: &str, position: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(title.trim().as_bytes());
        hasher.update(b"|");
        hasher.update(position.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Newest first, undated last. Equal keys compare equal so a stable sort
    /// keeps snapshot order among them.
    pub fn cmp_newest_first(&self, other: &Self) -> Ordering {
        match (self.published_at, other.published_at) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// True for absolute `http`/`https` URLs.
pub fn is_web_link(link: &str) -> bool {
    Url::parse(link)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Validating constructor for [`PressItem`].
#[derive(Debug, Clone)]
pub struct PressItemBuilder {
    id: String,
    title: String,
    link: String,
    description: String,
    published_at: Option<DateTime<Utc>>,
    categories: Vec<String>,
    raw_guid: Option<String>,
}

impl PressItemBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            link: String::new(),
            description: String::new(),
            published_at: None,
            categories: Vec::new(),
            raw_guid: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn raw_guid(mut self, raw_guid: Option<String>) -> Self {
        self.raw_guid = raw_guid;
        self
    }

    /// Validate and normalize the collected fields.
    ///
    /// Text fields are trimmed, blank categories dropped and duplicate
    /// categories collapsed (first occurrence wins).
    pub fn build(self) -> Result<PressItem, ItemError> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(ItemError::EmptyId);
        }

        let link = self.link.trim().to_string();
        if !link.is_empty() && !is_web_link(&link) {
            return Err(ItemError::InvalidLink(link));
        }

        let mut categories: Vec<String> = Vec::with_capacity(self.categories.len());
        for category in self.categories {
            let category = category.trim();
            if !category.is_empty() && !categories.iter().any(|c| c == category) {
                categories.push(category.to_string());
            }
        }

        Ok(PressItem {
            id,
            title: self.title.trim().to_string(),
            link,
            description: self.description,
            published_at: self.published_at,
            categories,
            raw_guid: self.raw_guid,
            source: SOURCE.to_string(),
        })
    }
}
