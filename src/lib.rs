//! # Presswire
//!
//! Ingests the City of Cologne press release feed and answers read queries
//! from an in-memory, time-bounded cache.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → Cache → Query
//! ```
//!
//! - [`fetcher`]: HTTP transport plus retry with exponential backoff
//! - [`normalizer`]: Converts the RSS document into [`PressItem`](domain::PressItem)s
//! - [`cache`]: TTL cache with single-flight background refresh
//! - [`query`]: latest / search / get / categories over a snapshot
//!
//! ## Quick Start
//!
//! ```bash
//! presswire latest -n 5
//! presswire search Verkehr --limit 10
//! presswire get item-123
//! presswire categories
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// fetcher, normalizer, cache, query engine.
pub mod app;

/// Cache store holding the current [`Snapshot`](domain::Snapshot).
///
/// - Fresh snapshots are served without network access
/// - Stale snapshots are served while one background refresh runs
/// - A cold cache loads synchronously and fails with `UpstreamUnavailable`
pub mod cache;

/// Command-line interface using clap.
///
/// - `latest [-n N]`
/// - `search <query> [--limit N]`
/// - `get <id>`
/// - `categories`
pub mod cli;

/// Configuration: defaults, optional TOML file, environment overrides.
pub mod config;

/// Core domain models.
///
/// - [`PressItem`](domain::PressItem): one normalized feed entry
/// - [`Snapshot`](domain::Snapshot): immutable set of items from one fetch
pub mod domain;

/// Feed retrieval.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for a single fetch attempt
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`RetryPolicy`](fetcher::RetryPolicy): bounded retry with exponential backoff
/// - [`FeedSource`](fetcher::FeedSource): fetch, retry and parse in one call
pub mod fetcher;

/// Feed parsing and normalization.
///
/// Tolerates missing fields, unknown elements and malformed dates; only a
/// document that is not a feed at all is rejected.
pub mod normalizer;

/// Query engine and ranking.
pub mod query;

#[cfg(test)]
mod testing;
