//! In-memory TTL cache with a background sweep.
//!
//! # Cache Key Strategy
//!
//! Callers own their key scheme; the search layer uses SHA-256 digests over
//! the normalized query and the sorted trusted-domain list so that
//! equivalent lookups collide deliberately.
//!
//! Expired entries are treated as misses on `get` even before the sweeper
//! runs, so a stale value is never returned past its expiry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: usize,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Keyed TTL store. Thread-safe via `parking_lot::RwLock`; reads proceed in
/// parallel, writes mutually exclude. A sweeper task removes expired entries
/// at a fixed interval and exits on `stop()`.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stop_tx: watch::Sender<bool>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Create a cache and start its sweeper. Must be called from within a
    /// tokio runtime.
    pub fn new(sweep_interval: Duration) -> Arc<Self> {
        let (stop_tx, stop_rx) = watch::channel(false);
        let cache = Arc::new(Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stop_tx,
        });

        let weak = Arc::downgrade(&cache);
        tokio::spawn(Self::sweep_loop(weak, sweep_interval, stop_rx));

        cache
    }

    async fn sweep_loop(
        cache: std::sync::Weak<Self>,
        interval: Duration,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it.
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    // A send of `true` or a dropped sender both end the sweep.
                    if changed.is_err() || *stop_rx.borrow() {
                        return;
                    }
                }
                _ = ticker.tick() => {
                    match cache.upgrade() {
                        Some(cache) => cache.remove_expired(),
                        None => return,
                    }
                }
            }
        }
    }

    /// Fetch a live value. Expired entries count as misses.
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.to_string(), entry);
    }

    pub fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Signal the sweeper to exit. Idempotent.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Drop every expired entry.
    pub fn remove_expired(&self) {
        let mut entries = self.entries.write();
        entries.retain(|_, entry| !entry.is_expired());
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.read().len(),
        }
    }
}
