//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use orion::cache::TtlCache;
use orion::domain::{Source, TrustLevel};
use orion::llm::MockLLMClient;
use orion::repository::{MemorySourceRepository, SourceRepository};
use orion::research::{QueryOrchestrator, SearchFanout};
use orion::search::{MockSearchClient, SearchClient, SearchResult};

pub const SWEEP: Duration = Duration::from_secs(300);
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Orchestrator with mock providers, no optional collaborators.
pub fn orchestrator(
    llm: Arc<MockLLMClient>,
    search: Arc<MockSearchClient>,
    sources: Arc<MemorySourceRepository>,
) -> QueryOrchestrator {
    orchestrator_with_timeout(llm, search, sources, Duration::from_secs(30))
}

pub fn orchestrator_with_timeout(
    llm: Arc<MockLLMClient>,
    search: Arc<MockSearchClient>,
    sources: Arc<MemorySourceRepository>,
    search_timeout: Duration,
) -> QueryOrchestrator {
    let fanout = SearchFanout::new(
        search as Arc<dyn SearchClient>,
        TtlCache::new(SWEEP),
        CACHE_TTL,
        search_timeout,
    );
    QueryOrchestrator::new(sources, llm, fanout)
}

/// Register a source for a user directly through the repository.
pub async fn seed_source(
    repo: &MemorySourceRepository,
    user_id: i64,
    url: &str,
    trust_level: TrustLevel,
) {
    let source = Source {
        id: 0,
        user_id,
        url: url.to_string(),
        name: String::new(),
        trust_level,
        is_user_added: true,
        created_at: Utc::now(),
    };
    repo.create(&source).await.expect("seed source");
}

pub fn search_result(url: &str, score: f64) -> SearchResult {
    SearchResult {
        title: format!("Result {}", url),
        url: url.to_string(),
        content: format!("Content for {}", url),
        score,
        published_date: String::new(),
    }
}
