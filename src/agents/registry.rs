//! Assembly of the full agent panel.

use std::sync::Arc;

use crate::agents::specializations::{AgentKind, SpecializedAgent};
use crate::agents::Agent;
use crate::llm::LLMClient;

/// Build every shipped specialization against one LLM client.
/// Registration order is the tie-break order during selection.
pub fn all_agents(llm: Arc<dyn LLMClient>) -> Vec<Arc<dyn Agent>> {
    AgentKind::ALL
        .iter()
        .map(|kind| {
            Arc::new(SpecializedAgent::new(*kind, Arc::clone(&llm))) as Arc<dyn Agent>
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLLMClient;

    #[test]
    fn test_panel_contains_all_specializations() {
        let agents = all_agents(Arc::new(MockLLMClient::new()));
        let names: Vec<&str> = agents.iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![
                "market-analyst",
                "regulatory-expert",
                "tech-specialist",
                "trends-analyst"
            ]
        );
    }
}
