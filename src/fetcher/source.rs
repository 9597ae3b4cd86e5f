use std::sync::Arc;

use crate::app::{PresswireError, Result};
use crate::domain::PressItem;
use crate::fetcher::{Fetcher, RetryPolicy};
use crate::normalizer::Normalizer;

/// The Fetcher → Parser pipeline for the one configured feed.
pub struct FeedSource {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    retry: RetryPolicy,
    url: String,
}

impl FeedSource {
    pub fn new(
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        normalizer: Normalizer,
        retry: RetryPolicy,
        url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            normalizer,
            retry,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the raw document, retrying transient failures.
    pub async fn fetch_raw(&self) -> Result<Vec<u8>> {
        self.retry
            .run(
                |attempt| {
                    tracing::debug!("Fetching {} (attempt {})", self.url, attempt);
                    self.fetcher.fetch(&self.url)
                },
                PresswireError::is_transient,
            )
            .await
            .map_err(|e| PresswireError::Fetch {
                attempts: e.attempts,
                last_error: e.last.to_string(),
            })
    }

    /// Fetch and parse. Parse failures are not retried.
    pub async fn load(&self) -> Result<Vec<PressItem>> {
        let body = self.fetch_raw().await?;
        self.normalizer.normalize(&body)
    }
}
