//! Pure query functions over a slice of items in snapshot order.

use std::collections::BTreeSet;

use crate::app::{PresswireError, Result};
use crate::domain::PressItem;

pub const DEFAULT_LATEST: usize = 10;
pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 100;

const TITLE_WEIGHT: u32 = 3;
const CATEGORY_WEIGHT: u32 = 2;
const DESCRIPTION_WEIGHT: u32 = 1;

/// Resolve an optional count parameter: absent means `default`, anything
/// outside `[1, 100]` is rejected.
pub fn resolve_limit(name: &str, value: Option<usize>, default: usize) -> Result<usize> {
    match value {
        None => Ok(default),
        Some(n) if (MIN_LIMIT..=MAX_LIMIT).contains(&n) => Ok(n),
        Some(n) => Err(PresswireError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, MIN_LIMIT, MAX_LIMIT, n
        ))),
    }
}

/// Trimmed, lowercased search needle. Blank queries are rejected.
pub fn normalize_query(query: &str) -> Result<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(PresswireError::Validation(
            "query must not be empty".to_string(),
        ));
    }
    Ok(query.to_lowercase())
}

/// The `n` newest items; undated items come last in snapshot order.
pub fn latest(items: &[PressItem], n: usize) -> Vec<&PressItem> {
    let mut sorted: Vec<&PressItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.cmp_newest_first(b));
    sorted.truncate(n);
    sorted
}

/// Relevance of `item` for an already lowercased `needle`.
///
/// Weights add up across fields: title 3, any category 2, description 1.
pub fn score(item: &PressItem, needle: &str) -> u32 {
    let mut score = 0;
    if item.title.to_lowercase().contains(needle) {
        score += TITLE_WEIGHT;
    }
    if item
        .categories
        .iter()
        .any(|c| c.to_lowercase().contains(needle))
    {
        score += CATEGORY_WEIGHT;
    }
    if item.description.to_lowercase().contains(needle) {
        score += DESCRIPTION_WEIGHT;
    }
    score
}

/// Matching items ranked by score, then date, then snapshot order.
pub fn search<'a>(items: &'a [PressItem], needle: &str, limit: usize) -> Vec<&'a PressItem> {
    let mut scored: Vec<(u32, &PressItem)> = items
        .iter()
        .map(|item| (score(item, needle), item))
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| a.cmp_newest_first(b)));

    scored
        .into_iter()
        .take(limit)
        .map(|(_, item)| item)
        .collect()
}

pub fn find<'a>(items: &'a [PressItem], id: &str) -> Option<&'a PressItem> {
    items.iter().find(|item| item.id == id)
}

/// Every category once, sorted ascending.
pub fn categories(items: &[PressItem]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| item.categories.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
