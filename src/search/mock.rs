//! Scripted search client for tests and offline runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::search::{SearchClient, SearchRequest, SearchResponse, SearchResult};
use crate::types::{AppError, Result};

/// Mock client returning configured results. Records every request so tests
/// can assert on call counts and parameters. An error, once set, applies to
/// all subsequent calls until cleared.
pub struct MockSearchClient {
    results: Mutex<Vec<SearchResult>>,
    fail_with: Mutex<Option<fn() -> AppError>>,
    delay: Mutex<Option<Duration>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl MockSearchClient {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            fail_with: Mutex::new(None),
            delay: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_results(self, results: Vec<SearchResult>) -> Self {
        *self.results.lock() = results;
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock() = Some(delay);
        self
    }

    pub fn failing_with(self, err: fn() -> AppError) -> Self {
        *self.fail_with.lock() = Some(err);
        self
    }

    /// Switch the client into failure mode after construction.
    pub fn set_error(&self, err: fn() -> AppError) {
        *self.fail_with.lock() = Some(err);
    }

    pub fn set_results(&self, results: Vec<SearchResult>) {
        *self.results.lock() = results;
        *self.fail_with.lock() = None;
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().clone()
    }
}

impl Default for MockSearchClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let query = request.query.clone();
        self.requests.lock().push(request);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = *self.fail_with.lock() {
            return Err(err());
        }

        let results = self.results.lock().clone();
        if results.is_empty() {
            return Err(AppError::NoResults);
        }

        Ok(SearchResponse {
            query,
            results,
            response_time: 0.5,
        })
    }
}

/// Convenience constructor for test fixtures.
pub fn result(url: &str, score: f64) -> SearchResult {
    SearchResult {
        title: format!("Result {}", url),
        url: url.to_string(),
        content: format!("Content for {}", url),
        score,
        published_date: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_configured_results() {
        let client = MockSearchClient::new().with_results(vec![result("https://a.com", 0.9)]);
        let resp = client.search(SearchRequest::default()).await.unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_results_error() {
        let client = MockSearchClient::new();
        assert!(matches!(
            client.search(SearchRequest::default()).await,
            Err(AppError::NoResults)
        ));
    }

    #[tokio::test]
    async fn test_error_mode() {
        let client = MockSearchClient::new().with_results(vec![result("https://a.com", 0.9)]);
        client.set_error(|| AppError::SearchRateLimited);
        assert!(matches!(
            client.search(SearchRequest::default()).await,
            Err(AppError::SearchRateLimited)
        ));
    }

    #[tokio::test]
    async fn test_records_requests() {
        let client = MockSearchClient::new().with_results(vec![result("https://a.com", 0.9)]);
        let request = SearchRequest {
            query: "fintech trends".to_string(),
            max_results: 7,
            ..Default::default()
        };
        client.search(request).await.unwrap();

        let recorded = client.requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].query, "fintech trends");
        assert_eq!(recorded[0].max_results, 7);
    }
}
