use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use super::query::QueryCache;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Used in place of a zero interval, which `tokio::time::interval` rejects
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Background worker that periodically drops expired query results.
/// `QueryCache::get` already ignores stale entries; this only frees memory.
pub struct CacheSweeper {
    cache: Arc<QueryCache>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl CacheSweeper {
    pub fn new(cache: Arc<QueryCache>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            tracing::warn!(
                "Cache sweep interval of zero replaced with {:?}",
                MIN_SWEEP_INTERVAL
            );
            MIN_SWEEP_INTERVAL
        } else {
            interval
        };

        Self {
            cache,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the background worker
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!("Cache sweeper started with interval {:?}", self.interval);

            let mut interval = time::interval(self.interval);
            // The first tick completes immediately
            interval.tick().await;

            while self.running.load(Ordering::SeqCst) {
                interval.tick().await;
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }

                let cleaned = self.cache.clean_expired();
                if cleaned > 0 {
                    tracing::info!("Cache sweeper removed {} expired entries", cleaned);
                }
            }

            tracing::info!("Cache sweeper stopped");
        })
    }

    /// Stop the worker
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if worker is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
