use std::path::Path;
use std::sync::Arc;

use url::Url;

use crate::app::error::Result;
use crate::cache::FeedCache;
use crate::config::Config;
use crate::fetcher::{FeedSource, Fetcher, HttpFetcher, RetryPolicy};
use crate::normalizer::Normalizer;
use crate::query::QueryEngine;

/// Owns every long-lived component; built once from a [`Config`].
pub struct AppContext {
    pub config: Config,
    pub cache: FeedCache,
    pub query: QueryEngine,
}

impl AppContext {
    /// Load configuration (from `config_path`, or the default location) and
    /// build a context over the live feed.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        Self::new(config)
    }

    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::new(config.http_timeout(), &config.user_agent)?);
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_fetcher(config: Config, fetcher: Arc<dyn Fetcher + Send + Sync>) -> Result<Self> {
        let normalizer = Normalizer::new(Url::parse(&config.base_url)?);
        let retry = RetryPolicy::new(config.http_retries, config.retry_base_delay());
        let source = FeedSource::new(fetcher, normalizer, retry, config.feed_url.clone());

        let cache = FeedCache::new(source, config.cache_ttl(), config.max_cache_size);
        let query = QueryEngine::new(cache.clone());

        Ok(Self {
            config,
            cache,
            query,
        })
    }
}
