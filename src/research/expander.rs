//! LLM-driven query expansion.

use serde::Deserialize;
use std::sync::Arc;

use crate::llm::LLMClient;

/// Turns one user question into up to `max_queries` web-search strings.
/// Never fails: any LLM or parse problem falls back to the original text.
pub struct QueryExpander {
    llm: Arc<dyn LLMClient>,
}

#[derive(Debug, Deserialize)]
struct ExpansionResponse {
    #[serde(default)]
    queries: Vec<String>,
}

impl QueryExpander {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    pub async fn expand(&self, user_query: &str, max_queries: usize) -> Vec<String> {
        let system_prompt = format!(
            "You are a search query optimizer for financial and technology research.\n\n\
Task: Generate 1-{} optimal web search queries.\n\n\
Rules:\n\
1. Queries in ENGLISH (sources are English)\n\
2. Use keywords, not full sentences\n\
3. Add the current year for time-sensitive topics\n\
4. Split complex questions into sub-topics\n\
5. Simple questions need only 1 query\n\n\
Response format (JSON only):\n\
{{\"queries\": [\"query1\", \"query2\"]}}",
            max_queries
        );

        let user_prompt = format!("User question: {}", user_query);

        let response = match self.llm.complete_with_system(&system_prompt, &user_prompt).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "query expansion failed, using original");
                return vec![user_query.to_string()];
            }
        };

        let parsed: ExpansionResponse = match serde_json::from_str(&response) {
            Ok(parsed) => parsed,
            Err(_) => return vec![user_query.to_string()],
        };

        if parsed.queries.is_empty() {
            return vec![user_query.to_string()];
        }

        let mut queries = parsed.queries;
        queries.truncate(max_queries);
        queries
    }
}
