use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::domain::PressItem;

/// Immutable set of items published by the cache in one piece.
///
/// Items keep upstream document order. A refresh never edits a snapshot; it
/// builds a new one and swaps it in.
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    items: Vec<PressItem>,
    fetched_at: DateTime<Utc>,
    loaded_at: Instant,
}

impl Snapshot {
    pub fn new(generation: u64, items: Vec<PressItem>) -> Self {
        Self {
            generation,
            items,
            fetched_at: Utc::now(),
            loaded_at: Instant::now(),
        }
    }

    /// Build a snapshot keeping only the first `max_items` items.
    pub fn capped(generation: u64, mut items: Vec<PressItem>, max_items: usize) -> Self {
        if items.len() > max_items {
            tracing::warn!(
                "Feed returned {} items, keeping the first {}",
                items.len(),
                max_items
            );
            items.truncate(max_items);
        }
        Self::new(generation, items)
    }

    /// Monotonically increasing publish counter assigned by the cache.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn items(&self) -> &[PressItem] {
        &self.items
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
