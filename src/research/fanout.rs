//! Cached, deduplicated parallel search.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::TtlCache;
use crate::metrics::Metrics;
use crate::search::{SearchClient, SearchRequest, SearchResult};
use crate::types::{AppError, Result};

pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Fans a set of queries out to the search provider concurrently, caching
/// each (query, domains) pair. Merged results are deduplicated by URL
/// (first occurrence wins), stably sorted by descending score, and capped.
pub struct SearchFanout {
    search: Arc<dyn SearchClient>,
    cache: Arc<TtlCache<Vec<SearchResult>>>,
    cache_ttl: Duration,
    timeout: Duration,
    metrics: Option<Arc<Metrics>>,
}

impl SearchFanout {
    pub fn new(
        search: Arc<dyn SearchClient>,
        cache: Arc<TtlCache<Vec<SearchResult>>>,
        cache_ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            search,
            cache,
            cache_ttl,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run every query concurrently under a shared deadline. Per-query
    /// failures are tolerated; the call fails only when nothing at all
    /// accumulates.
    pub async fn search(
        &self,
        queries: &[String],
        include_domains: &[String],
        max_results: usize,
    ) -> Result<Vec<SearchResult>> {
        let lookups = queries.iter().map(|query| {
            let query = query.clone();
            async move {
                match tokio::time::timeout(
                    self.timeout,
                    self.single_query(&query, include_domains, max_results),
                )
                .await
                {
                    Ok(Ok(results)) => Some(results),
                    Ok(Err(err)) => {
                        tracing::warn!(error = %err, query = %query, "search query failed");
                        None
                    }
                    Err(_) => {
                        tracing::warn!(query = %query, "search query timed out");
                        None
                    }
                }
            }
        });

        let batches = futures::future::join_all(lookups).await;

        let mut seen = HashSet::new();
        let mut merged: Vec<SearchResult> = Vec::new();
        for batch in batches.into_iter().flatten() {
            for result in batch {
                if seen.insert(result.url.clone()) {
                    merged.push(result);
                }
            }
        }

        // Stable sort keeps first-seen order among equal scores.
        merged.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        merged.truncate(max_results);

        if merged.is_empty() {
            return Err(AppError::NoResults);
        }
        Ok(merged)
    }

    async fn single_query(
        &self,
        query: &str,
        include_domains: &[String],
        max_results: usize,
    ) -> Result<Vec<SearchResult>> {
        let key = cache_key(query, include_domains);

        if let Some(cached) = self.cache.get(&key) {
            if let Some(metrics) = &self.metrics {
                metrics.record_cache_hit();
            }
            return Ok(cached);
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_miss();
        }

        let started = Instant::now();
        let response = self
            .search
            .search(SearchRequest {
                query: query.to_string(),
                include_domains: include_domains.to_vec(),
                max_results,
                search_depth: "basic".to_string(),
                ..Default::default()
            })
            .await;

        match response {
            Ok(response) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_search_request("success", started.elapsed());
                }
                self.cache.set(&key, response.results.clone(), self.cache_ttl);
                Ok(response.results)
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_search_request("error", started.elapsed());
                }
                Err(err)
            }
        }
    }
}

/// Deterministic digest over the normalized query and the sorted domain
/// list: `search:` + first 8 bytes of the SHA-256, hex-encoded.
pub fn cache_key(query: &str, include_domains: &[String]) -> String {
    let mut domains: Vec<&str> = include_domains.iter().map(|s| s.as_str()).collect();
    domains.sort_unstable();

    let data = format!("{},{}", normalize_query(query), domains.join(","));
    let digest = Sha256::digest(data.as_bytes());

    let mut key = String::with_capacity(23);
    key.push_str("search:");
    for byte in &digest[..8] {
        key.push_str(&format!("{:02x}", byte));
    }
    key
}

/// Lowercase, trim, and collapse internal whitespace.
fn normalize_query(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
