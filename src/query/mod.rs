//! The four read operations, answered from the cached snapshot.
//!
//! Parameters are validated before the cache is touched, so a bad request
//! never triggers a fetch.

pub mod ranking;

use serde::{Deserialize, Serialize};

use crate::app::{PresswireError, Result};
use crate::cache::FeedCache;
use crate::domain::PressItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemsResponse {
    pub items: Vec<PressItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

#[derive(Clone)]
pub struct QueryEngine {
    cache: FeedCache,
}

impl QueryEngine {
    pub fn new(cache: FeedCache) -> Self {
        Self { cache }
    }

    /// Newest `n` items (default 10).
    pub async fn latest(&self, n: Option<usize>) -> Result<ItemsResponse> {
        let n = ranking::resolve_limit("n", n, ranking::DEFAULT_LATEST)?;
        let snapshot = self.cache.get_snapshot().await?;

        Ok(ItemsResponse {
            items: ranking::latest(snapshot.items(), n)
                .into_iter()
                .cloned()
                .collect(),
        })
    }

    /// Ranked substring search (default limit 20).
    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<ItemsResponse> {
        let needle = ranking::normalize_query(query)?;
        let limit = ranking::resolve_limit("limit", limit, ranking::DEFAULT_SEARCH_LIMIT)?;
        let snapshot = self.cache.get_snapshot().await?;

        let items: Vec<PressItem> = ranking::search(snapshot.items(), &needle, limit)
            .into_iter()
            .cloned()
            .collect();
        tracing::debug!("Search for {:?} matched {} items", query, items.len());

        Ok(ItemsResponse { items })
    }

    pub async fn get(&self, id: &str) -> Result<PressItem> {
        let snapshot = self.cache.get_snapshot().await?;
        ranking::find(snapshot.items(), id)
            .cloned()
            .ok_or_else(|| PresswireError::ItemNotFound(id.to_string()))
    }

    pub async fn categories(&self) -> Result<CategoriesResponse> {
        let snapshot = self.cache.get_snapshot().await?;
        Ok(CategoriesResponse {
            categories: ranking::categories(snapshot.items()),
        })
    }
}
