pub mod http_fetcher;
pub mod retry;
pub mod source;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;
pub use retry::{RetryError, RetryPolicy};
pub use source::FeedSource;

/// Transport for the raw feed document.
///
/// One call is one attempt. Retrying is the job of [`RetryPolicy`], applied by
/// [`FeedSource`], so implementations stay free of backoff logic.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
