//! Expert agent system.
//!
//! This module provides the multi-expert analysis layer:
//!
//! - **Agent Trait** - Base trait that all agents implement
//! - **BaseAgent** - Keyword-scored, LLM-backed specialist
//! - **Specializations** - Table-driven canonical agent definitions
//! - **Coordinator** - Selects agents, runs them in parallel, synthesizes
//!
//! Agents are data, not code: adding a specialization is a table entry in
//! `specializations`, not a new type.

pub mod coordinator;
pub mod registry;
pub mod specializations;

pub use coordinator::{Coordinator, CoordinatorResponse};
pub use registry::all_agents;
pub use specializations::{AgentKind, SpecializedAgent};

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::domain::Strategy;
use crate::llm::LLMClient;
use crate::search::SearchResult;
use crate::types::{AppError, Result};

/// Base trait for all expert agents.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn expertise(&self) -> &[String];

    /// Confidence in [0.0, 1.0] that this agent should handle the question.
    fn can_handle(&self, question: &str) -> f64;

    async fn process(&self, req: &AgentRequest) -> Result<AgentResponse>;
}

#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub question: String,
    pub search_results: Vec<SearchResult>,
    /// Prior knowledge from the world model; may be empty.
    pub context: String,
    pub strategy: Strategy,
}

impl AgentRequest {
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(AppError::EmptyQuestion);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub agent_name: String,
    pub content: String,
    pub confidence: f64,
    /// `[Sn]` markers cited by the answer, first-seen order, unique.
    pub source_refs: Vec<String>,
    pub insights: Vec<String>,
}

impl AgentResponse {
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(AppError::EmptyContent);
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(AppError::Internal(
                "confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Keyword-matched specialist backed by a single LLM call.
pub struct BaseAgent {
    name: String,
    expertise: Vec<String>,
    keywords: Vec<String>,
    system_prompt: String,
    llm: Arc<dyn LLMClient>,
}

impl BaseAgent {
    pub fn new(
        name: &str,
        expertise: Vec<String>,
        keywords: Vec<String>,
        system_prompt: &str,
        llm: Arc<dyn LLMClient>,
    ) -> Self {
        Self {
            name: name.to_string(),
            expertise,
            keywords,
            system_prompt: system_prompt.to_string(),
            llm,
        }
    }

    fn build_user_prompt(req: &AgentRequest) -> String {
        let mut prompt = format!("Question: {}\n\n", req.question);

        if !req.context.is_empty() {
            prompt.push_str(&format!("Context: {}\n\n", req.context));
        }

        if !req.search_results.is_empty() {
            prompt.push_str("Sources:\n");
            for (i, r) in req.search_results.iter().enumerate() {
                prompt.push_str(&format!(
                    "[S{}] {}\nURL: {}\nContent: {}\n\n",
                    i + 1,
                    r.title,
                    r.url,
                    r.content
                ));
            }
        }

        prompt
    }
}

#[async_trait]
impl Agent for BaseAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn expertise(&self) -> &[String] {
        &self.expertise
    }

    /// Lower-cased substring match over the keyword set. Zero matches score
    /// 0.0; any match scores at least 0.5.
    fn can_handle(&self, question: &str) -> f64 {
        if self.keywords.is_empty() {
            return 0.0;
        }

        let question = question.to_lowercase();
        let matches = self
            .keywords
            .iter()
            .filter(|kw| question.contains(&kw.to_lowercase()))
            .count();

        if matches == 0 {
            return 0.0;
        }

        let confidence = matches as f64 / self.keywords.len() as f64;
        confidence.max(0.5)
    }

    async fn process(&self, req: &AgentRequest) -> Result<AgentResponse> {
        req.validate()?;

        let user_prompt = Self::build_user_prompt(req);

        let content = self
            .llm
            .complete_with_system(&self.system_prompt, &user_prompt)
            .await
            .map_err(|e| {
                tracing::error!(agent = %self.name, error = %e, "llm call failed");
                e
            })?;

        let confidence = self.can_handle(&req.question).max(0.5);

        Ok(AgentResponse {
            agent_name: self.name.clone(),
            source_refs: parse_source_refs(&content),
            insights: parse_insights(&content),
            content,
            confidence,
        })
    }
}

static SOURCE_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[S(\d+)\]").expect("valid source ref pattern"));

static INSIGHTS_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)insights:\s*\n((?:\s*[-•*]\s*.+\n?)+)").expect("valid insights pattern")
});

static INSIGHT_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-•*]\s*(.+)").expect("valid insight item pattern"));

/// Unique `[Sn]` markers in first-seen order.
pub fn parse_source_refs(content: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut refs = Vec::new();
    for m in SOURCE_REF_RE.find_iter(content) {
        let marker = m.as_str().to_string();
        if seen.insert(marker.clone()) {
            refs.push(marker);
        }
    }
    refs
}

/// Bulleted lines under an `Insights:` heading.
pub fn parse_insights(content: &str) -> Vec<String> {
    let Some(section) = INSIGHTS_SECTION_RE
        .captures(content)
        .and_then(|c| c.get(1))
    else {
        return Vec::new();
    };

    INSIGHT_ITEM_RE
        .captures_iter(section.as_str())
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLLMClient;

    fn agent(keywords: Vec<&str>) -> BaseAgent {
        BaseAgent::new(
            "test-agent",
            vec!["testing".to_string()],
            keywords.into_iter().map(String::from).collect(),
            "You are a test agent.",
            Arc::new(MockLLMClient::new()),
        )
    }

    #[test]
    fn test_can_handle_no_match_is_zero() {
        let a = agent(vec!["market", "revenue"]);
        assert_eq!(a.can_handle("how do I bake bread"), 0.0);
    }

    #[test]
    fn test_can_handle_any_match_is_at_least_half() {
        let a = agent(vec!["market", "revenue", "valuation", "funding"]);
        let score = a.can_handle("what is the market size");
        assert!(score >= 0.5);
    }

    #[test]
    fn test_can_handle_full_match() {
        let a = agent(vec!["market", "revenue"]);
        let score = a.can_handle("market revenue outlook");
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_can_handle_is_case_insensitive() {
        let a = agent(vec!["API"]);
        assert!(a.can_handle("designing an api gateway") >= 0.5);
    }

    #[test]
    fn test_can_handle_empty_keywords() {
        let a = agent(vec![]);
        assert_eq!(a.can_handle("anything"), 0.0);
    }

    #[tokio::test]
    async fn test_process_rejects_empty_question() {
        let a = agent(vec!["market"]);
        let req = AgentRequest {
            question: "  ".to_string(),
            search_results: vec![],
            context: String::new(),
            strategy: Strategy::standard(),
        };
        assert!(matches!(
            a.process(&req).await,
            Err(AppError::EmptyQuestion)
        ));
    }

    #[tokio::test]
    async fn test_process_parses_refs_and_insights() {
        let llm = Arc::new(MockLLMClient::new().with_response(
            "The market grew [S1] and consolidated [S2]. See [S1] again.\n\nInsights:\n- growth is accelerating\n- consolidation favors incumbents\n",
        ));
        let a = BaseAgent::new(
            "market-analyst",
            vec![],
            vec!["market".to_string()],
            "prompt",
            llm,
        );
        let req = AgentRequest {
            question: "market outlook".to_string(),
            search_results: vec![],
            context: String::new(),
            strategy: Strategy::standard(),
        };

        let resp = a.process(&req).await.unwrap();
        assert_eq!(resp.source_refs, vec!["[S1]", "[S2]"]);
        assert_eq!(resp.insights.len(), 2);
        assert_eq!(resp.agent_name, "market-analyst");
        assert!(resp.confidence >= 0.5);
    }

    #[test]
    fn test_parse_source_refs_unique_first_seen() {
        let refs = parse_source_refs("[S2] then [S1] then [S2] and [S3]");
        assert_eq!(refs, vec!["[S2]", "[S1]", "[S3]"]);
    }

    #[test]
    fn test_parse_insights_bullet_styles() {
        let content = "Answer.\n\nInsights:\n- dash item\n* star item\n• bullet item\n";
        let insights = parse_insights(content);
        assert_eq!(insights, vec!["dash item", "star item", "bullet item"]);
    }

    #[test]
    fn test_parse_insights_missing_section() {
        assert!(parse_insights("no insights here").is_empty());
    }

    #[test]
    fn test_user_prompt_enumerates_sources() {
        let req = AgentRequest {
            question: "q".to_string(),
            search_results: vec![
                crate::search::mock::result("https://a.com", 0.9),
                crate::search::mock::result("https://b.com", 0.8),
            ],
            context: "prior knowledge".to_string(),
            strategy: Strategy::standard(),
        };
        let prompt = BaseAgent::build_user_prompt(&req);
        assert!(prompt.contains("Question: q"));
        assert!(prompt.contains("Context: prior knowledge"));
        assert!(prompt.contains("[S1]"));
        assert!(prompt.contains("[S2]"));
    }
}
