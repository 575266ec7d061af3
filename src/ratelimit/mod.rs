//! Per-principal sliding-window rate limiting.
//!
//! Each principal gets an independent window; admission records a timestamp
//! and stale timestamps are pruned both on the calling path and by a
//! periodic sweeper that exits on `stop()`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;

const DEFAULT_LIMIT: usize = 10;
const WINDOW: Duration = Duration::from_secs(60);
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

pub struct RateLimiter {
    requests: Mutex<HashMap<i64, Vec<Instant>>>,
    limit: usize,
    window: Duration,
    stop_tx: watch::Sender<bool>,
}

impl RateLimiter {
    /// Create a limiter admitting `requests_per_minute` calls per principal
    /// and start its sweeper. Non-positive limits fall back to the default.
    pub fn new(requests_per_minute: usize) -> Arc<Self> {
        let limit = if requests_per_minute == 0 {
            DEFAULT_LIMIT
        } else {
            requests_per_minute
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let limiter = Arc::new(Self {
            requests: Mutex::new(HashMap::new()),
            limit,
            window: WINDOW,
            stop_tx,
        });

        let weak = Arc::downgrade(&limiter);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await;
            let mut stop_rx = stop_rx;
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            return;
                        }
                    }
                    _ = ticker.tick() => {
                        match weak.upgrade() {
                            Some(limiter) => limiter.sweep(),
                            None => return,
                        }
                    }
                }
            }
        });

        limiter
    }

    /// Admit iff fewer than `limit` requests fall inside the window; on
    /// admission the current instant is recorded.
    pub fn allow(&self, principal_id: i64) -> bool {
        let mut requests = self.requests.lock();
        let now = Instant::now();
        let cutoff = now - self.window;

        let timestamps = requests.entry(principal_id).or_default();
        timestamps.retain(|t| *t > cutoff);

        if timestamps.len() >= self.limit {
            return false;
        }

        timestamps.push(now);
        true
    }

    /// How many more requests the principal may make right now.
    pub fn remaining(&self, principal_id: i64) -> usize {
        let requests = self.requests.lock();
        let cutoff = Instant::now() - self.window;

        let used = requests
            .get(&principal_id)
            .map(|ts| ts.iter().filter(|t| **t > cutoff).count())
            .unwrap_or(0);

        self.limit.saturating_sub(used)
    }

    /// Approximate wall-clock time when the oldest recorded request leaves
    /// the window. Returns now when nothing is recorded.
    pub fn reset_time(&self, principal_id: i64) -> DateTime<Utc> {
        let requests = self.requests.lock();
        let now = Instant::now();

        let Some(oldest) = requests
            .get(&principal_id)
            .and_then(|ts| ts.iter().min())
            .copied()
        else {
            return Utc::now();
        };

        let until_reset = (oldest + self.window).saturating_duration_since(now);
        Utc::now() + chrono::Duration::from_std(until_reset).unwrap_or_default()
    }

    /// Signal the sweeper to exit. Idempotent.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    fn sweep(&self) {
        let mut requests = self.requests.lock();
        let cutoff = Instant::now() - self.window;
        requests.retain(|_, timestamps| {
            timestamps.retain(|t| *t > cutoff);
            !timestamps.is_empty()
        });
    }

    #[cfg(test)]
    fn tracked_principals(&self) -> usize {
        self.requests.lock().len()
    }
}
