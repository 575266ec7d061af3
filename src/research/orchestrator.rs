//! End-to-end query processing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::agents::{AgentRequest, Coordinator};
use crate::domain::{extract_domain, QueryRequest, QueryResponse, SourceRef, TrustLevel};
use crate::llm::LLMClient;
use crate::metrics::Metrics;
use crate::repository::SourceRepository;
use crate::research::{CriticService, QueryExpander, SearchFanout, WorldModelService};
use crate::search::SearchResult;
use crate::types::{AppError, Result};

const DEFAULT_MAX_QUERIES: usize = 3;
const DEFAULT_MAX_RESULTS: usize = 15;

/// Truncation budget for source content in the analyst prompt.
const MAX_SOURCE_CONTENT: usize = 2000;

const ANALYST_SYSTEM_PROMPT: &str = "You are an expert analyst in financial technology and banking.\n\n\
Rules:\n\
1. Use ONLY information from provided sources\n\
2. Reference sources as [S1], [S2], etc.\n\
3. If information is insufficient, say so honestly\n\
4. Structure: key points, examples, conclusions\n\
5. Be objective, present different viewpoints";

/// Drives a query through the full pipeline. The critic, coordinator,
/// world model, and metrics are capability slots: absent collaborators
/// degrade to the simpler path instead of failing.
pub struct QueryOrchestrator {
    sources: Arc<dyn SourceRepository>,
    llm: Arc<dyn LLMClient>,
    expander: QueryExpander,
    fanout: SearchFanout,
    critic: Option<Arc<CriticService>>,
    world_model: Option<Arc<WorldModelService>>,
    coordinator: Option<Arc<Coordinator>>,
    metrics: Option<Arc<Metrics>>,
}

struct PipelineOutcome {
    response: QueryResponse,
    results: Vec<SearchResult>,
}

impl QueryOrchestrator {
    pub fn new(
        sources: Arc<dyn SourceRepository>,
        llm: Arc<dyn LLMClient>,
        fanout: SearchFanout,
    ) -> Self {
        let expander = QueryExpander::new(Arc::clone(&llm));
        Self {
            sources,
            llm,
            expander,
            fanout,
            critic: None,
            world_model: None,
            coordinator: None,
            metrics: None,
        }
    }

    pub fn with_critic(mut self, critic: Arc<CriticService>) -> Self {
        self.critic = Some(critic);
        self
    }

    pub fn with_world_model(mut self, world_model: Arc<WorldModelService>) -> Self {
        self.world_model = Some(world_model);
        self
    }

    pub fn with_coordinator(mut self, coordinator: Arc<Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Process one query. The strategy timeout bounds everything except the
    /// background knowledge extraction, which runs detached and may outlive
    /// the response.
    pub async fn process(&self, mut req: QueryRequest) -> Result<QueryResponse> {
        let start = Instant::now();

        if let Some(metrics) = &self.metrics {
            metrics.inc_requests_in_flight();
        }

        let outcome = self.process_bounded(&mut req).await;

        if let Some(metrics) = &self.metrics {
            metrics.dec_requests_in_flight();
            let status = match &outcome {
                Ok(_) => "success",
                Err(AppError::EmptyQuery)
                | Err(AppError::QueryTooLong)
                | Err(AppError::InvalidStrategy)
                | Err(AppError::InvalidMaxQueries)
                | Err(AppError::InvalidMaxResults)
                | Err(AppError::InvalidAnalysisIterations)
                | Err(AppError::InvalidTimeout) => "validation_error",
                Err(_) => "error",
            };
            metrics.record_request("query", status, start.elapsed());
        }

        outcome
    }

    async fn process_bounded(&self, req: &mut QueryRequest) -> Result<QueryResponse> {
        req.validate()?;
        req.sanitize();

        tracing::info!(
            user_id = req.user_id,
            query_length = req.text.len(),
            strategy = req.strategy.kind.as_str(),
            max_queries = req.strategy.max_queries,
            max_results = req.strategy.max_results,
            use_critic = req.strategy.use_critic,
            "processing query"
        );

        let outcome = if req.strategy.timeout_seconds > 0 {
            let deadline = Duration::from_secs(req.strategy.timeout_seconds);
            match tokio::time::timeout(deadline, self.run_pipeline(req)).await {
                Ok(outcome) => outcome?,
                Err(_) => return Err(AppError::DeadlineExceeded),
            }
        } else {
            self.run_pipeline(req).await?
        };

        tracing::info!(
            user_id = req.user_id,
            sources_used = outcome.results.len(),
            "query processed"
        );

        // Knowledge extraction is detached from the request lifetime: the
        // caller's deadline has no hold over it, only process shutdown does.
        if let Some(world_model) = &self.world_model {
            let world_model = Arc::clone(world_model);
            let user_id = req.user_id;
            let answer = outcome.response.text.clone();
            let results = outcome.results.clone();
            let question = req.text.clone();
            let strategy = req.strategy;
            tokio::spawn(async move {
                if let Err(err) = world_model
                    .extract_and_store(user_id, &answer, &results, &question, strategy)
                    .await
                {
                    tracing::warn!(error = %err, user_id, "failed to save to world model");
                }
            });
        }

        Ok(outcome.response)
    }

    async fn run_pipeline(&self, req: &QueryRequest) -> Result<PipelineOutcome> {
        // Prior knowledge is best-effort.
        let world_context = match &self.world_model {
            Some(world_model) => {
                let context = world_model.get_relevant_context(req.user_id, &req.text).await;
                if !context.is_empty() {
                    tracing::debug!(
                        user_id = req.user_id,
                        context_length = context.len(),
                        "using world model context"
                    );
                }
                context
            }
            None => String::new(),
        };

        let user_sources = self.sources.list_by_user(req.user_id).await?;
        if user_sources.is_empty() {
            return Err(AppError::NoSources);
        }

        let mut domains = Vec::with_capacity(user_sources.len());
        let mut trust_map: HashMap<String, TrustLevel> = HashMap::new();
        for source in &user_sources {
            let domain = source.domain();
            if !domain.is_empty() {
                trust_map.insert(domain.clone(), source.trust_level);
                domains.push(domain);
            }
        }

        let max_queries = if req.strategy.max_queries == 0 {
            DEFAULT_MAX_QUERIES
        } else {
            req.strategy.max_queries
        };
        let queries = self.expander.expand(&req.text, max_queries).await;

        let max_results = if req.strategy.max_results == 0 {
            DEFAULT_MAX_RESULTS
        } else {
            req.strategy.max_results
        };
        let results = self.fanout.search(&queries, &domains, max_results).await?;

        // Multi-agent analysis when a coordinator is wired; any failure or
        // empty answer falls back to the single analyst call.
        let mut answer = String::new();
        if let Some(coordinator) = &self.coordinator {
            match coordinator
                .process(AgentRequest {
                    question: req.text.clone(),
                    search_results: results.clone(),
                    context: world_context.clone(),
                    strategy: req.strategy,
                })
                .await
            {
                Ok(resp) if !resp.final_answer.is_empty() => {
                    tracing::debug!(
                        agents_used = resp.agents_used.len(),
                        "using coordinator answer"
                    );
                    answer = resp.final_answer;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "coordinator processing failed, falling back to analyze");
                }
            }
        }

        if answer.is_empty() {
            answer = self.analyze(&req.text, &results).await?;
        }

        if req.strategy.use_critic {
            if let Some(critic) = &self.critic {
                answer = critic.review_with_retry(answer, &results, &req.text).await;
            }
        }

        let response = QueryResponse {
            sources: to_source_refs(&results, &trust_map),
            text: answer,
        };

        Ok(PipelineOutcome { response, results })
    }

    /// Single-call analysis over the enumerated sources.
    async fn analyze(&self, question: &str, results: &[SearchResult]) -> Result<String> {
        let mut prompt = String::from("Sources:\n\n");
        for (i, r) in results.iter().enumerate() {
            prompt.push_str(&format!("[S{}] {} ({})\n", i + 1, r.title, r.url));
            prompt.push_str(&format!("Score: {:.2}\n", r.score));
            let content = truncate_to(&r.content, MAX_SOURCE_CONTENT);
            prompt.push_str(content);
            if content.len() < r.content.len() {
                prompt.push_str("...");
            }
            prompt.push_str("\n\n");
        }
        prompt.push_str("---\n\n");
        prompt.push_str(&format!("User question: {}", question));

        let started = Instant::now();
        let outcome = self
            .llm
            .complete_with_system(ANALYST_SYSTEM_PROMPT, &prompt)
            .await;

        if let Some(metrics) = &self.metrics {
            let status = if outcome.is_ok() { "success" } else { "error" };
            metrics.record_llm_request(self.llm.provider_name(), status, started.elapsed());
        }

        outcome
    }
}

/// Assign `[S1]..[Sn]` markers to the ranked results, attaching the trust
/// level of the result's domain (medium when unknown).
fn to_source_refs(
    results: &[SearchResult],
    trust_map: &HashMap<String, TrustLevel>,
) -> Vec<SourceRef> {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let trust_level = trust_map
                .get(&extract_domain(&r.url))
                .copied()
                .unwrap_or(TrustLevel::Medium);

            SourceRef {
                marker: format!("[S{}]", i + 1),
                title: r.title.clone(),
                url: r.url.clone(),
                trust_level,
            }
        })
        .collect()
}

/// Cut `s` at the largest char boundary not past `max` bytes.
fn truncate_to(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::mock::result;

    #[test]
    fn test_markers_are_contiguous_and_one_indexed() {
        let results = vec![
            result("https://a.com", 0.9),
            result("https://b.com", 0.8),
            result("https://c.com", 0.7),
        ];
        let refs = to_source_refs(&results, &HashMap::new());

        for (i, r) in refs.iter().enumerate() {
            assert_eq!(r.marker, format!("[S{}]", i + 1));
        }
    }

    #[test]
    fn test_trust_resolved_from_domain_map() {
        let results = vec![
            result("https://www.trusted.com/article", 0.9),
            result("https://unknown.org/post", 0.8),
        ];
        let mut trust_map = HashMap::new();
        trust_map.insert("trusted.com".to_string(), TrustLevel::High);

        let refs = to_source_refs(&results, &trust_map);
        assert_eq!(refs[0].trust_level, TrustLevel::High);
        assert_eq!(refs[1].trust_level, TrustLevel::Medium);
    }

    #[test]
    fn test_truncate_to_respects_char_boundaries() {
        let s = "héllo wörld";
        let cut = truncate_to(s, 3);
        assert!(cut.len() <= 3);
        assert!(s.starts_with(cut));
        assert_eq!(truncate_to("short", 100), "short");
    }
}
