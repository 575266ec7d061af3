//! Tavily search client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::search::{SearchClient, SearchRequest, SearchResponse, SearchResult};
use crate::types::{AppError, Result};

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
const DEFAULT_MAX_RESULTS: usize = 5;
const DEFAULT_DEPTH: &str = "basic";

const BACKOFF: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

pub struct TavilyClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TavilyRequest {
    api_key: String,
    query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    include_domains: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exclude_domains: Vec<String>,
    max_results: usize,
    search_depth: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    time_range: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    topic: String,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    query: String,
    #[serde(default)]
    results: Vec<TavilyResult>,
    #[serde(default)]
    response_time: f64,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    published_date: String,
}

impl TavilyClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            base_url
        };

        Self {
            api_key,
            base_url,
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn send_once(&self, body: &TavilyRequest) -> Result<SearchResponse> {
        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::SearchFailed(format!("do request: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::SearchFailed(format!("read response: {}", e)))?;

        match status {
            StatusCode::OK => {
                let parsed: TavilyResponse = serde_json::from_str(&text)
                    .map_err(|e| AppError::SearchFailed(format!("unmarshal response: {}", e)))?;
                if parsed.results.is_empty() {
                    return Err(AppError::NoResults);
                }
                Ok(Self::to_search_response(parsed))
            }
            StatusCode::UNAUTHORIZED => Err(AppError::SearchUnauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(AppError::SearchRateLimited),
            StatusCode::BAD_REQUEST => Err(AppError::SearchInvalidRequest),
            s if s.is_server_error() => Err(AppError::SearchFailed(format!(
                "server error: {}",
                s.as_u16()
            ))),
            s => {
                tracing::error!(status = %s, body = %text, "tavily request failed");
                Err(AppError::SearchFailed(format!("status {}", s.as_u16())))
            }
        }
    }

    fn is_retryable(err: &AppError) -> bool {
        matches!(err, AppError::SearchFailed(msg)
            if msg.starts_with("server error") || msg.starts_with("do request"))
    }

    fn to_search_response(resp: TavilyResponse) -> SearchResponse {
        let results = resp
            .results
            .into_iter()
            .map(|r| SearchResult {
                title: r.title,
                url: r.url,
                content: r.content,
                score: r.score,
                published_date: r.published_date,
            })
            .collect();

        SearchResponse {
            query: resp.query,
            results,
            response_time: resp.response_time,
        }
    }
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        let body = TavilyRequest {
            api_key: self.api_key.clone(),
            query: request.query,
            include_domains: request.include_domains,
            exclude_domains: request.exclude_domains,
            max_results: if request.max_results == 0 {
                DEFAULT_MAX_RESULTS
            } else {
                request.max_results
            },
            search_depth: if request.search_depth.is_empty() {
                DEFAULT_DEPTH.to_string()
            } else {
                request.search_depth
            },
            time_range: request.time_range,
            topic: request.topic,
            include_answer: false,
            include_raw_content: false,
        };

        let mut last_err = AppError::SearchFailed("no attempts made".to_string());
        for attempt in 0..=BACKOFF.len() {
            if attempt > 0 {
                tokio::time::sleep(BACKOFF[attempt - 1]).await;
            }

            match self.send_once(&body).await {
                Ok(response) => return Ok(response),
                Err(err) if Self::is_retryable(&err) => {
                    tracing::warn!(attempt, error = %err, query = %body.query, "search failed, retrying");
                    last_err = err;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let client = TavilyClient::new("key".to_string(), String::new(), Duration::from_secs(30));
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TavilyClient::is_retryable(&AppError::SearchFailed(
            "server error: 502".to_string()
        )));
        assert!(TavilyClient::is_retryable(&AppError::SearchFailed(
            "do request: timed out".to_string()
        )));
        assert!(!TavilyClient::is_retryable(&AppError::SearchRateLimited));
        assert!(!TavilyClient::is_retryable(&AppError::SearchUnauthorized));
        assert!(!TavilyClient::is_retryable(&AppError::SearchInvalidRequest));
        assert!(!TavilyClient::is_retryable(&AppError::NoResults));
    }

    #[test]
    fn test_request_serialization_omits_empty_fields() {
        let body = TavilyRequest {
            api_key: "k".to_string(),
            query: "q".to_string(),
            include_domains: vec![],
            exclude_domains: vec![],
            max_results: 5,
            search_depth: "basic".to_string(),
            time_range: String::new(),
            topic: String::new(),
            include_answer: false,
            include_raw_content: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("include_domains").is_none());
        assert!(json.get("time_range").is_none());
        assert_eq!(json["search_depth"], "basic");
    }

    #[test]
    fn test_response_conversion() {
        let resp = TavilyResponse {
            query: "q".to_string(),
            results: vec![TavilyResult {
                title: "T".to_string(),
                url: "https://example.com".to_string(),
                content: "body".to_string(),
                score: 0.8,
                published_date: "2025-01-01".to_string(),
            }],
            response_time: 0.4,
        };
        let converted = TavilyClient::to_search_response(resp);
        assert_eq!(converted.results.len(), 1);
        assert_eq!(converted.results[0].url, "https://example.com");
        assert!((converted.results[0].score - 0.8).abs() < f64::EPSILON);
    }
}
