//! Process metrics.
//!
//! A single registry of counters, gauges, and latency recorders, owned by
//! the application state and exposed as a JSON snapshot. Recording is
//! lock-light: plain atomics for fixed counters, a small locked map for
//! labeled ones.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
struct CounterMap {
    counts: RwLock<HashMap<String, u64>>,
}

impl CounterMap {
    fn inc(&self, label: String) {
        *self.counts.write().entry(label).or_insert(0) += 1;
    }

    fn snapshot(&self) -> HashMap<String, u64> {
        self.counts.read().clone()
    }
}

#[derive(Default)]
struct LatencyRecorder {
    count: AtomicU64,
    total_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl LatencyRecorder {
    fn record(&self, duration: Duration) {
        let ms = duration.as_millis() as u64;
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ms.fetch_add(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LatencySnapshot {
        let count = self.count.load(Ordering::Relaxed);
        let total_ms = self.total_ms.load(Ordering::Relaxed);
        LatencySnapshot {
            count,
            total_ms,
            max_ms: self.max_ms.load(Ordering::Relaxed),
            avg_ms: if count == 0 { 0.0 } else { total_ms as f64 / count as f64 },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencySnapshot {
    pub count: u64,
    pub total_ms: u64,
    pub max_ms: u64,
    pub avg_ms: f64,
}

/// Central metrics registry.
#[derive(Default)]
pub struct Metrics {
    requests: CounterMap,
    llm_requests: CounterMap,
    search_requests: CounterMap,
    rate_limit_hits: CounterMap,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    requests_in_flight: AtomicI64,
    active_users: AtomicI64,
    request_latency: LatencyRecorder,
    llm_latency: LatencyRecorder,
    search_latency: LatencyRecorder,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_requests_in_flight(&self) {
        self.requests_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_requests_in_flight(&self) {
        self.requests_in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_request(&self, kind: &str, status: &str, duration: Duration) {
        self.requests.inc(format!("{}.{}", kind, status));
        self.request_latency.record(duration);
    }

    pub fn record_llm_request(&self, provider: &str, status: &str, duration: Duration) {
        self.llm_requests.inc(format!("{}.{}", provider, status));
        self.llm_latency.record(duration);
    }

    pub fn record_search_request(&self, status: &str, duration: Duration) {
        self.search_requests.inc(status.to_string());
        self.search_latency.record(duration);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limit_hit(&self, principal_id: i64) {
        self.rate_limit_hits.inc(principal_id.to_string());
    }

    pub fn set_active_users(&self, count: i64) {
        self.active_users.store(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.snapshot(),
            llm_requests: self.llm_requests.snapshot(),
            search_requests: self.search_requests.snapshot(),
            rate_limit_hits: self.rate_limit_hits.snapshot(),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            requests_in_flight: self.requests_in_flight.load(Ordering::Relaxed),
            active_users: self.active_users.load(Ordering::Relaxed),
            request_latency: self.request_latency.snapshot(),
            llm_latency: self.llm_latency.snapshot(),
            search_latency: self.search_latency.snapshot(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests: HashMap<String, u64>,
    pub llm_requests: HashMap<String, u64>,
    pub search_requests: HashMap<String, u64>,
    pub rate_limit_hits: HashMap<String, u64>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub requests_in_flight: i64,
    pub active_users: i64,
    pub request_latency: LatencySnapshot,
    pub llm_latency: LatencySnapshot,
    pub search_latency: LatencySnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counters_by_label() {
        let metrics = Metrics::new();
        metrics.record_request("query", "success", Duration::from_millis(10));
        metrics.record_request("query", "success", Duration::from_millis(30));
        metrics.record_request("query", "validation_error", Duration::from_millis(1));

        let snap = metrics.snapshot();
        assert_eq!(snap.requests["query.success"], 2);
        assert_eq!(snap.requests["query.validation_error"], 1);
        assert_eq!(snap.request_latency.count, 3);
        assert_eq!(snap.request_latency.max_ms, 30);
    }

    #[test]
    fn test_in_flight_gauge() {
        let metrics = Metrics::new();
        metrics.inc_requests_in_flight();
        metrics.inc_requests_in_flight();
        metrics.dec_requests_in_flight();
        assert_eq!(metrics.snapshot().requests_in_flight, 1);
    }

    #[test]
    fn test_cache_counters() {
        let metrics = Metrics::new();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_cache_miss();
        let snap = metrics.snapshot();
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 2);
    }

    #[test]
    fn test_latency_average() {
        let metrics = Metrics::new();
        metrics.record_search_request("success", Duration::from_millis(100));
        metrics.record_search_request("error", Duration::from_millis(300));
        let snap = metrics.snapshot();
        assert!((snap.search_latency.avg_ms - 200.0).abs() < 0.001);
    }
}
