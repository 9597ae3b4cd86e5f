use std::collections::HashSet;

use feed_rs::model::Entry;
use feed_rs::parser;
use url::Url;

use crate::app::{PresswireError, Result};
use crate::config::DEFAULT_BASE_URL;
use crate::domain::item::is_web_link;
use crate::domain::{ItemError, PressItem};

/// Turns a raw feed document into [`PressItem`]s in document order.
///
/// Only a document that cannot be read as a feed at all is an error.
/// Defects inside single entries are repaired or defaulted.
#[derive(Clone)]
pub struct Normalizer {
    base_url: Url,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"))
    }
}

impl Normalizer {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn normalize(&self, body: &[u8]) -> Result<Vec<PressItem>> {
        // An empty id marks an entry without GUID; we pick the fallback ourselves.
        let feed = parser::Builder::new()
            .id_generator(|_links, _title, _uri| String::new())
            .build()
            .parse(body)
            .map_err(|e| PresswireError::FeedParse(e.to_string()))?;

        if feed.entries.is_empty() {
            return Err(PresswireError::FeedParse("feed contains no items".into()));
        }

        let mut seen = HashSet::with_capacity(feed.entries.len());
        let mut items = Vec::with_capacity(feed.entries.len());

        for (position, entry) in feed.entries.into_iter().enumerate() {
            let item = match self.normalize_entry(position, entry) {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!("Skipping entry {}: {}", position, e);
                    continue;
                }
            };
            if !seen.insert(item.id.clone()) {
                tracing::warn!("Dropping entry {} with duplicate id {}", position, item.id);
                continue;
            }
            items.push(item);
        }

        Ok(items)
    }

    fn normalize_entry(&self, position: usize, entry: Entry) -> std::result::Result<PressItem, ItemError> {
        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();

        let mut link = entry
            .links
            .first()
            .map(|l| self.resolve_link(&l.href))
            .unwrap_or_default();
        if !link.is_empty() && !is_web_link(&link) {
            tracing::warn!("Entry {} has unusable link {:?}, dropping it", position, link);
            link.clear();
        }

        let guid = Some(entry.id.trim().to_string()).filter(|g| !g.is_empty());

        let id = match (&guid, link.is_empty()) {
            (Some(guid), _) => guid.clone(),
            (None, false) => PressItem::generate_id(&link),
            (None, true) => PressItem::fallback_id(&title, position),
        };

        if link.is_empty() {
            tracing::warn!("Entry {} ({:?}) has no link", position, title);
        }

        let description = entry
            .content
            .and_then(|c| c.body)
            .or(entry.summary.map(|s| s.content))
            .unwrap_or_default();

        let published_at = entry.published.or(entry.updated);

        let categories = entry.categories.into_iter().map(|c| c.term);

        PressItem::builder(id)
            .title(title)
            .link(link)
            .description(description)
            .published_at(published_at)
            .categories(categories)
            .raw_guid(guid)
            .build()
    }

    /// Absolute links pass through; anything else is joined onto the base URL.
    fn resolve_link(&self, href: &str) -> String {
        let href = href.trim();
        if href.is_empty() {
            return String::new();
        }
        if let Ok(url) = Url::parse(href) {
            return url.to_string();
        }
        self.base_url
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string())
    }
}
