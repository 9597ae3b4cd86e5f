//! Time-bounded, single-flight cache over the feed pipeline.
//!
//! The cache holds at most one [`Snapshot`]. A fresh snapshot is served
//! straight from memory. A stale one is still served, while exactly one
//! background task refreshes it. Only a cold cache makes callers wait on
//! the network.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::{PresswireError, Result};
use crate::domain::Snapshot;
use crate::fetcher::FeedSource;

/// Observable state of the cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

/// Counters and the most recent refresh failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Pipeline runs started (cold loads, background and forced refreshes)
    pub fetches: u64,
    /// Pipeline runs that ended in an error
    pub refresh_failures: u64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    /// Generation of the currently published snapshot (0 = none yet)
    pub generation: u64,
}

/// Cheap-to-clone handle to the shared cache.
#[derive(Clone)]
pub struct FeedCache {
    inner: Arc<Inner>,
}

struct Inner {
    source: FeedSource,
    ttl: Duration,
    max_items: usize,
    current: RwLock<Option<Arc<Snapshot>>>,
    /// Held for every pipeline run, so publishes are serialized.
    refresh_lock: AsyncMutex<()>,
    /// Set while a background refresh task exists.
    refreshing: AtomicBool,
    generation: AtomicU64,
    stats: Mutex<CacheStats>,
    /// When the last pipeline run failed. Cleared by the next success.
    last_failure: Mutex<Option<Instant>>,
}

impl FeedCache {
    pub fn new(source: FeedSource, ttl: Duration, max_items: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                ttl,
                max_items: max_items.max(1),
                current: RwLock::new(None),
                refresh_lock: AsyncMutex::new(()),
                refreshing: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                stats: Mutex::new(CacheStats::default()),
                last_failure: Mutex::new(None),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub fn state(&self) -> CacheState {
        match self.inner.current() {
            None => CacheState::Empty,
            Some(snapshot) if snapshot.is_fresh(self.inner.ttl) => CacheState::Fresh,
            Some(_) => CacheState::Stale,
        }
    }

    /// Current snapshot without triggering any fetch.
    pub fn peek(&self) -> Option<Arc<Snapshot>> {
        self.inner.current()
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats_snapshot()
    }

    /// Snapshot to answer a query from.
    ///
    /// Fails only when the cache is cold and the first load fails
    /// ([`PresswireError::UpstreamUnavailable`]). A stale snapshot triggers
    /// at most one background refresh per TTL window, counting a failed
    /// refresh as the start of a new window.
    pub async fn get_snapshot(&self) -> Result<Arc<Snapshot>> {
        if let Some(snapshot) = self.inner.current() {
            if self.inner.refresh_due(&snapshot) {
                self.spawn_refresh();
            }
            return Ok(snapshot);
        }

        self.load_cold().await
    }

    /// Run the pipeline now and publish the result. Errors are returned,
    /// and the previous snapshot (if any) stays in place.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.inner.refresh_lock.lock().await;
        self.inner.run_pipeline().await
    }

    /// Drop the current snapshot. The next read loads from upstream again.
    pub async fn clear(&self) {
        let _guard = self.inner.refresh_lock.lock().await;
        *self.inner.write_current() = None;
        *self.inner.lock_last_failure() = None;
        self.inner.lock_stats().generation = 0;
        info!("Cache cleared");
    }

    async fn load_cold(&self) -> Result<Arc<Snapshot>> {
        let _guard = self.inner.refresh_lock.lock().await;

        // Another caller may have finished the load while we waited.
        if let Some(snapshot) = self.inner.current() {
            return Ok(snapshot);
        }

        self.inner
            .run_pipeline()
            .await
            .map_err(|e| PresswireError::UpstreamUnavailable(e.to_string()))
    }

    fn spawn_refresh(&self) {
        if self
            .inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Refresh already in flight, serving stale snapshot");
            return;
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.refresh_in_background().await;
            inner.refreshing.store(false, Ordering::Release);
        });
    }
}

impl Inner {
    fn current(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn write_current(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<Snapshot>>> {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_stats(&self) -> std::sync::MutexGuard<'_, CacheStats> {
        self.stats
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_last_failure(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn stats_snapshot(&self) -> CacheStats {
        self.lock_stats().clone()
    }

    /// Stale, and no failed run within the last TTL.
    fn refresh_due(&self, snapshot: &Snapshot) -> bool {
        if snapshot.is_fresh(self.ttl) {
            return false;
        }
        match *self.lock_last_failure() {
            Some(failed_at) => failed_at.elapsed() >= self.ttl,
            None => true,
        }
    }

    async fn refresh_in_background(&self) {
        let _guard = self.refresh_lock.lock().await;

        // A forced refresh may have landed (or failed) while we waited.
        if let Some(snapshot) = self.current() {
            if !self.refresh_due(&snapshot) {
                return;
            }
        }

        if let Err(e) = self.run_pipeline().await {
            warn!("Background refresh failed, keeping stale data: {}", e);
        }
    }

    /// Fetch, parse and publish. Caller must hold `refresh_lock`.
    async fn run_pipeline(&self) -> Result<Arc<Snapshot>> {
        self.lock_stats().fetches += 1;

        match self.source.load().await {
            Ok(items) => {
                let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                let snapshot = Arc::new(Snapshot::capped(generation, items, self.max_items));
                *self.write_current() = Some(snapshot.clone());
                *self.lock_last_failure() = None;
                self.lock_stats().generation = generation;

                info!(
                    "Published snapshot {} with {} items from {}",
                    generation,
                    snapshot.len(),
                    self.source.url()
                );
                Ok(snapshot)
            }
            Err(e) => {
                *self.lock_last_failure() = Some(Instant::now());
                let mut stats = self.lock_stats();
                stats.refresh_failures += 1;
                stats.last_error = Some(e.to_string());
                stats.last_error_at = Some(Utc::now());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{rss, source, ScriptedFetcher, Step, SAMPLE_RSS};
    use futures::future::join_all;
    use tokio::sync::Semaphore;
    use tokio_test::{assert_err, assert_ok};

    const TTL: Duration = Duration::from_secs(300);

    fn cache(fetcher: &Arc<ScriptedFetcher>, max_items: usize) -> FeedCache {
        FeedCache::new(source(fetcher.clone(), 3), TTL, max_items)
    }

    async fn settle<F: Fn() -> bool>(done: F) {
        for _ in 0..1000 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_start_loads_once() {
        let fetcher = Arc::new(ScriptedFetcher::always(SAMPLE_RSS));
        let cache = cache(&fetcher, 1000);
        assert_eq!(cache.state(), CacheState::Empty);

        let first = assert_ok!(cache.get_snapshot().await);
        let second = assert_ok!(cache.get_snapshot().await);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 3);
        assert_eq!(first.generation(), 1);
        assert_eq!(cache.state(), CacheState::Fresh);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_start_failure_is_upstream_unavailable() {
        let fetcher = Arc::new(ScriptedFetcher::script(
            vec![Step::Status(500), Step::Status(500), Step::Status(500)],
            Step::Body(SAMPLE_RSS.into()),
        ));
        let cache = cache(&fetcher, 1000);

        let err = assert_err!(cache.get_snapshot().await);
        assert!(matches!(err, PresswireError::UpstreamUnavailable(_)));
        assert_eq!(cache.state(), CacheState::Empty);
        assert_eq!(cache.stats().refresh_failures, 1);

        // Nothing cached, so the next read tries again.
        assert_ok!(cache.get_snapshot().await);
        assert_eq!(cache.state(), CacheState::Fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_cold_callers_share_one_load() {
        let fetcher = Arc::new(ScriptedFetcher::always(SAMPLE_RSS));
        let cache = cache(&fetcher, 1000);

        let snapshots = join_all((0..10).map(|_| cache.get_snapshot())).await;

        let first = snapshots[0].as_ref().unwrap();
        for snapshot in &snapshots {
            assert!(Arc::ptr_eq(first, snapshot.as_ref().unwrap()));
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_read_is_single_flight() {
        let gate = Arc::new(Semaphore::new(1));
        let fetcher = Arc::new(ScriptedFetcher::always(SAMPLE_RSS).gated(gate.clone()));
        let cache = cache(&fetcher, 1000);

        let warm = assert_ok!(cache.get_snapshot().await);
        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        assert_eq!(cache.state(), CacheState::Stale);

        let reads = join_all((0..20).map(|_| cache.get_snapshot())).await;
        for read in &reads {
            assert!(Arc::ptr_eq(&warm, read.as_ref().unwrap()));
        }

        // The refresh task is now parked on the gate.
        settle(|| fetcher.calls() == 2).await;
        assert!(cache.is_refreshing());

        for _ in 0..5 {
            let read = assert_ok!(cache.get_snapshot().await);
            assert!(Arc::ptr_eq(&warm, &read));
        }
        assert_eq!(fetcher.calls(), 2);

        gate.add_permits(1);
        settle(|| cache.peek().map(|s| s.generation()) == Some(2)).await;

        assert_eq!(cache.state(), CacheState::Fresh);
        assert_eq!(cache.get_snapshot().await.unwrap().generation(), 2);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_stale_data() {
        let fetcher = Arc::new(ScriptedFetcher::script(
            vec![Step::Body(SAMPLE_RSS.into())],
            Step::Status(503),
        ));
        let cache = cache(&fetcher, 1000);

        let warm = assert_ok!(cache.get_snapshot().await);
        tokio::time::advance(TTL).await;

        let stale = assert_ok!(cache.get_snapshot().await);
        assert!(Arc::ptr_eq(&warm, &stale));

        settle(|| cache.stats().refresh_failures == 1 && !cache.is_refreshing()).await;

        let stats = cache.stats();
        assert!(stats.last_error.as_deref().unwrap_or("").contains("503"));
        assert!(stats.last_error_at.is_some());
        assert_eq!(stats.generation, 1);
        assert_eq!(cache.state(), CacheState::Stale);
        assert!(Arc::ptr_eq(&warm, &cache.peek().unwrap()));
        // One cold load plus three attempts for the refresh.
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_backs_off_for_one_ttl() {
        let fetcher = Arc::new(ScriptedFetcher::script(
            vec![Step::Body(SAMPLE_RSS.into())],
            Step::Status(503),
        ));
        let cache = cache(&fetcher, 1000);

        let warm = assert_ok!(cache.get_snapshot().await);
        tokio::time::advance(TTL).await;

        for _ in 0..10 {
            let read = assert_ok!(cache.get_snapshot().await);
            assert!(Arc::ptr_eq(&warm, &read));
            settle(|| !cache.is_refreshing()).await;
            tokio::time::advance(Duration::from_secs(1)).await;
        }

        // One cold load, then a single refresh of three attempts.
        assert_eq!(fetcher.calls(), 4);
        assert_eq!(cache.stats().refresh_failures, 1);
        assert_eq!(cache.state(), CacheState::Stale);

        // A full TTL after the failure, the next read tries again.
        tokio::time::advance(TTL).await;
        assert_ok!(cache.get_snapshot().await);
        settle(|| cache.stats().refresh_failures == 2 && !cache.is_refreshing()).await;
        assert_eq!(fetcher.calls(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_succeeds_after_transient_failures() {
        let next = rss(&[("n1", "Neu", "Kultur", "Wed, 16 Oct 2024 08:00:00 +0200")]);
        let fetcher = Arc::new(ScriptedFetcher::script(
            vec![
                Step::Body(SAMPLE_RSS.into()),
                Step::Status(502),
                Step::Status(504),
            ],
            Step::Body(next),
        ));
        let cache = cache(&fetcher, 1000);

        assert_ok!(cache.get_snapshot().await);
        tokio::time::advance(TTL).await;
        assert_ok!(cache.get_snapshot().await);

        settle(|| cache.peek().map(|s| s.generation()) == Some(2)).await;

        let snapshot = cache.peek().unwrap();
        assert_eq!(snapshot.items()[0].id, "n1");
        assert_eq!(cache.stats().refresh_failures, 0);
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_cap_keeps_first_items() {
        let fetcher = Arc::new(ScriptedFetcher::always(SAMPLE_RSS));
        let cache = cache(&fetcher, 2);

        let snapshot = assert_ok!(cache.get_snapshot().await);
        let ids: Vec<_> = snapshot.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["item-123", "item-124"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_refresh_publishes_newer_generation() {
        let fetcher = Arc::new(ScriptedFetcher::always(SAMPLE_RSS));
        let cache = cache(&fetcher, 1000);

        let first = assert_ok!(cache.get_snapshot().await);
        let second = assert_ok!(cache.refresh().await);
        let third = assert_ok!(cache.refresh().await);

        assert!(first.generation() < second.generation());
        assert!(second.generation() < third.generation());
        assert!(Arc::ptr_eq(&third, &cache.get_snapshot().await.unwrap()));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_refresh_failure_surfaces_and_keeps_snapshot() {
        let fetcher = Arc::new(ScriptedFetcher::script(
            vec![Step::Body(SAMPLE_RSS.into())],
            Step::Body("<broken".into()),
        ));
        let cache = cache(&fetcher, 1000);

        let warm = assert_ok!(cache.get_snapshot().await);
        let err = assert_err!(cache.refresh().await);

        assert!(matches!(err, PresswireError::FeedParse(_)));
        assert!(Arc::ptr_eq(&warm, &cache.peek().unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_returns_to_empty() {
        let fetcher = Arc::new(ScriptedFetcher::always(SAMPLE_RSS));
        let cache = cache(&fetcher, 1000);

        assert_ok!(cache.get_snapshot().await);
        cache.clear().await;

        assert_eq!(cache.state(), CacheState::Empty);
        assert!(cache.peek().is_none());
        assert_eq!(cache.stats().generation, 0);

        let reloaded = assert_ok!(cache.get_snapshot().await);
        assert_eq!(reloaded.generation(), 2);
        assert_eq!(fetcher.calls(), 2);
    }
}
