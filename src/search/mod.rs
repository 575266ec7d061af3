//! Web search provider integration.

pub mod mock;
pub mod tavily;

pub use mock::MockSearchClient;
pub use tavily::TavilyClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Result;

/// Search provider abstraction. One call, one ranked result page.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse>;
}

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
    pub max_results: usize,
    pub search_depth: String,
    pub time_range: String,
    pub topic: String,
}

#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub response_time: f64,
}

/// One search hit. `content` is untrusted provider text; `score` is the
/// provider's relevance in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
    #[serde(default)]
    pub published_date: String,
}
