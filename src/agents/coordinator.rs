//! Multi-agent coordination: selection, parallel execution, synthesis.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use crate::agents::{Agent, AgentRequest, AgentResponse};
use crate::domain::{Strategy, StrategyKind};
use crate::llm::LLMClient;
use crate::types::{AppError, Result};

/// Agents scoring below this are skipped unless nobody qualifies.
const MIN_CONFIDENCE: f64 = 0.3;

#[derive(Debug)]
pub struct CoordinatorResponse {
    pub final_answer: String,
    pub agent_responses: Vec<AgentResponse>,
    pub agents_used: Vec<String>,
    pub processing_time: Duration,
}

/// Orchestrates a panel of expert agents for one question.
pub struct Coordinator {
    agents: Vec<Arc<dyn Agent>>,
    llm: Arc<dyn LLMClient>,
}

impl Coordinator {
    pub fn new(agents: Vec<Arc<dyn Agent>>, llm: Arc<dyn LLMClient>) -> Self {
        Self { agents, llm }
    }

    pub async fn process(&self, req: AgentRequest) -> Result<CoordinatorResponse> {
        let start = Instant::now();

        req.validate()?;

        let max_agents = max_agents_for(&req.strategy);
        let selected = self.select_agents(&req.question, max_agents);

        tracing::info!(
            count = selected.len(),
            strategy = req.strategy.kind.as_str(),
            "selected agents"
        );

        let responses = self.run_parallel(&selected, &req).await;
        if responses.is_empty() {
            return Err(AppError::NoAgentResponses);
        }

        let names: Vec<String> = responses.iter().map(|r| r.agent_name.clone()).collect();

        // A single response is returned verbatim; synthesis only pays off
        // with multiple perspectives.
        let final_answer = if responses.len() == 1 {
            responses[0].content.clone()
        } else {
            self.synthesize(&responses, &req.question).await?
        };

        Ok(CoordinatorResponse {
            final_answer,
            agent_responses: responses,
            agents_used: names,
            processing_time: start.elapsed(),
        })
    }

    /// Score all agents and keep the best `max_agents`. Ties keep
    /// registration order (the sort is stable). If nobody clears the
    /// threshold, everyone is considered.
    fn select_agents(&self, question: &str, max_agents: usize) -> Vec<Arc<dyn Agent>> {
        if self.agents.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(Arc<dyn Agent>, f64)> = self
            .agents
            .iter()
            .map(|a| (Arc::clone(a), a.can_handle(question)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut selected: Vec<Arc<dyn Agent>> = scored
            .iter()
            .filter(|(_, score)| *score >= MIN_CONFIDENCE)
            .map(|(a, _)| Arc::clone(a))
            .collect();

        if selected.is_empty() {
            selected = scored.into_iter().map(|(a, _)| a).collect();
        }

        selected.truncate(max_agents);
        selected
    }

    /// Run the selected agents concurrently. Individual failures are logged
    /// and skipped; they never abort siblings.
    async fn run_parallel(
        &self,
        agents: &[Arc<dyn Agent>],
        req: &AgentRequest,
    ) -> Vec<AgentResponse> {
        let mut set = JoinSet::new();
        for agent in agents {
            let agent = Arc::clone(agent);
            let req = req.clone();
            set.spawn(async move {
                let name = agent.name().to_string();
                (name, agent.process(&req).await)
            });
        }

        let mut responses = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, Ok(response))) => responses.push(response),
                Ok((name, Err(err))) => {
                    tracing::warn!(agent = %name, error = %err, "agent failed");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "agent task panicked");
                }
            }
        }
        responses
    }

    async fn synthesize(&self, responses: &[AgentResponse], question: &str) -> Result<String> {
        let mut experts = String::new();
        for (i, r) in responses.iter().enumerate() {
            experts.push_str(&format!(
                "[Expert {}: {}]\n{}\n\n",
                i + 1,
                r.agent_name,
                r.content
            ));
        }

        let system_prompt = format!(
            "You are a Synthesizer: combine several expert answers into one coherent text.\n\n\
Expert answers:\n{}\n\
Merge the experts' viewpoints, highlighting where they agree and where they diverge.\n\
Preserve source references like [S1], [S2], etc.\n\
Structure: big picture first, then details, conclusions at the end.",
            experts
        );

        self.llm
            .complete_with_system(&system_prompt, &format!("User question: {}", question))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "synthesis failed");
                e
            })
    }
}

/// Agent quota per strategy.
pub fn max_agents_for(strategy: &Strategy) -> usize {
    match strategy.kind {
        StrategyKind::Quick => 1,
        StrategyKind::Standard => 2,
        StrategyKind::Deep => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::BaseAgent;
    use crate::llm::MockLLMClient;

    fn keyword_agent(name: &str, keywords: Vec<&str>, response: &str) -> Arc<dyn Agent> {
        Arc::new(BaseAgent::new(
            name,
            vec![],
            keywords.into_iter().map(String::from).collect(),
            "system",
            Arc::new(MockLLMClient::new().with_response(response)),
        ))
    }

    fn request(question: &str, strategy: Strategy) -> AgentRequest {
        AgentRequest {
            question: question.to_string(),
            search_results: vec![],
            context: String::new(),
            strategy,
        }
    }

    #[test]
    fn test_quota_by_strategy() {
        assert_eq!(max_agents_for(&Strategy::quick()), 1);
        assert_eq!(max_agents_for(&Strategy::standard()), 2);
        assert_eq!(max_agents_for(&Strategy::deep()), 4);
    }

    #[tokio::test]
    async fn test_selection_respects_quota() {
        let agents = vec![
            keyword_agent("a", vec!["market"], "a answer"),
            keyword_agent("b", vec!["market"], "b answer"),
            keyword_agent("c", vec!["market"], "c answer"),
        ];
        let coordinator = Coordinator::new(agents, Arc::new(MockLLMClient::new()));

        let selected = coordinator.select_agents("market question", 2);
        assert_eq!(selected.len(), 2);
    }

    #[tokio::test]
    async fn test_selection_ties_keep_registration_order() {
        let agents = vec![
            keyword_agent("first", vec!["market"], "x"),
            keyword_agent("second", vec!["market"], "x"),
        ];
        let coordinator = Coordinator::new(agents, Arc::new(MockLLMClient::new()));

        let selected = coordinator.select_agents("market", 2);
        assert_eq!(selected[0].name(), "first");
        assert_eq!(selected[1].name(), "second");
    }

    #[tokio::test]
    async fn test_selection_falls_back_to_all_when_none_qualify() {
        let agents = vec![
            keyword_agent("a", vec!["regulation"], "x"),
            keyword_agent("b", vec!["blockchain"], "x"),
        ];
        let coordinator = Coordinator::new(agents, Arc::new(MockLLMClient::new()));

        let selected = coordinator.select_agents("completely unrelated", 1);
        assert_eq!(selected.len(), 1);
    }

    #[tokio::test]
    async fn test_single_response_returned_verbatim() {
        let agents = vec![keyword_agent("solo", vec!["market"], "the only answer [S1]")];
        let synth_llm = Arc::new(MockLLMClient::new().with_response("SYNTHESIZED"));
        let coordinator = Coordinator::new(agents, Arc::clone(&synth_llm) as Arc<dyn LLMClient>);

        let resp = coordinator
            .process(request("market outlook", Strategy::quick()))
            .await
            .unwrap();

        assert_eq!(resp.final_answer, "the only answer [S1]");
        assert_eq!(resp.agents_used, vec!["solo"]);
        // No synthesis call for a single agent.
        assert_eq!(synth_llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_multiple_responses_are_synthesized() {
        let agents = vec![
            keyword_agent("a", vec!["market"], "answer a [S1]"),
            keyword_agent("b", vec!["market"], "answer b [S2]"),
        ];
        let synth_llm = Arc::new(MockLLMClient::new().with_response("combined view [S1][S2]"));
        let coordinator = Coordinator::new(agents, Arc::clone(&synth_llm) as Arc<dyn LLMClient>);

        let resp = coordinator
            .process(request("market outlook", Strategy::standard()))
            .await
            .unwrap();

        assert_eq!(resp.final_answer, "combined view [S1][S2]");
        assert_eq!(resp.agent_responses.len(), 2);
        assert_eq!(synth_llm.call_count(), 1);
        let call = synth_llm.last_call().unwrap();
        assert!(call.system.contains("[Expert 1:"));
        assert!(call.system.contains("[Expert 2:"));
    }

    #[tokio::test]
    async fn test_agent_failures_do_not_abort_siblings() {
        let failing = Arc::new(BaseAgent::new(
            "broken",
            vec![],
            vec!["market".to_string()],
            "system",
            Arc::new(MockLLMClient::new().failing_with(|| AppError::LLMRateLimited)),
        )) as Arc<dyn Agent>;
        let working = keyword_agent("working", vec!["market"], "good answer");

        let coordinator = Coordinator::new(vec![failing, working], Arc::new(MockLLMClient::new()));
        let resp = coordinator
            .process(request("market", Strategy::standard()))
            .await
            .unwrap();

        assert_eq!(resp.agents_used, vec!["working"]);
        assert_eq!(resp.final_answer, "good answer");
    }

    #[tokio::test]
    async fn test_all_agents_failing_is_an_error() {
        let failing = Arc::new(BaseAgent::new(
            "broken",
            vec![],
            vec!["market".to_string()],
            "system",
            Arc::new(MockLLMClient::new().failing_with(|| AppError::LLMRateLimited)),
        )) as Arc<dyn Agent>;

        let coordinator = Coordinator::new(vec![failing], Arc::new(MockLLMClient::new()));
        let result = coordinator
            .process(request("market", Strategy::quick()))
            .await;

        assert!(matches!(result, Err(AppError::NoAgentResponses)));
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let coordinator = Coordinator::new(vec![], Arc::new(MockLLMClient::new()));
        let result = coordinator.process(request("", Strategy::quick())).await;
        assert!(matches!(result, Err(AppError::EmptyQuestion)));
    }
}
