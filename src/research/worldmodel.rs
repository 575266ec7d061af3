//! Per-user world model: context retrieval and knowledge extraction.

use chrono::Utc;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::{Entity, EntityType, Fact, ResearchSession, Strategy};
use crate::llm::LLMClient;
use crate::repository::WorldModelRepository;
use crate::search::SearchResult;
use crate::types::{AppError, Result};

/// Byte budget for the prior-knowledge block injected into prompts.
pub const MAX_CONTEXT_SIZE: usize = 2000;

const EXTRACTION_SYSTEM_PROMPT: &str = "You are a fact extraction assistant. \
Extract key facts and named entities from research answers.\n\
Always respond with valid JSON only, no markdown formatting.";

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "about", "above", "after", "again", "all", "also", "and", "any", "because", "before",
    "between", "but", "by", "can", "for", "from", "how", "if", "in", "into", "it", "its", "just",
    "me", "more", "most", "no", "not", "of", "on", "or", "other", "out", "over", "own", "same",
    "so", "some", "such", "than", "that", "their", "them", "then", "there", "these", "they",
    "this", "those", "through", "to", "too", "under", "up", "very", "what", "when", "where",
    "which", "while", "who", "whom", "why", "with", "you", "your", "tell",
];

/// Aggregate view of a user's accumulated knowledge.
#[derive(Debug, Clone)]
pub struct KnowledgeSummary {
    pub total_facts: usize,
    pub total_entities: usize,
    pub recent_sessions: Vec<ResearchSession>,
    pub top_entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    #[serde(default)]
    facts: Vec<ExtractedFact>,
    #[serde(default)]
    entities: Vec<ExtractedEntity>,
}

#[derive(Debug, Deserialize)]
struct ExtractedFact {
    #[serde(default)]
    content: String,
    #[serde(default)]
    source_url: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct ExtractedEntity {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    entity_type: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
}

/// Knowledge store front: keyword retrieval in, LLM extraction out.
pub struct WorldModelService {
    repo: Arc<dyn WorldModelRepository>,
    llm: Arc<dyn LLMClient>,
}

impl WorldModelService {
    pub fn new(repo: Arc<dyn WorldModelRepository>, llm: Arc<dyn LLMClient>) -> Self {
        Self { repo, llm }
    }

    /// Collect prior facts relevant to the question, capped at
    /// `MAX_CONTEXT_SIZE` bytes. Missing data yields an empty string; this
    /// never fails.
    pub async fn get_relevant_context(&self, user_id: i64, question: &str) -> String {
        if question.is_empty() {
            return String::new();
        }

        let keywords = extract_keywords(question);
        if keywords.is_empty() {
            return String::new();
        }

        let mut fact_set: HashMap<String, Fact> = HashMap::new();
        for keyword in &keywords {
            if keyword.len() < 3 {
                continue;
            }
            match self.repo.search_facts(user_id, keyword).await {
                Ok(facts) => {
                    for fact in facts {
                        fact_set.insert(fact.id.clone(), fact);
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, keyword = %keyword, "search facts failed");
                }
            }
        }

        if fact_set.is_empty() {
            return String::new();
        }

        let mut facts: Vec<Fact> = fact_set.into_values().collect();
        facts.sort_by(|a, b| b.extracted_at.cmp(&a.extracted_at).then(a.id.cmp(&b.id)));

        let mut context = String::from("Relevant facts from previous research:\n");
        for fact in facts {
            let mut line = format!("- {}", fact.content);
            if let Some(url) = &fact.source_url {
                line.push_str(&format!(" (source: {})", url));
            }
            line.push('\n');

            if context.len() + line.len() > MAX_CONTEXT_SIZE {
                break;
            }
            context.push_str(&line);
        }

        context
    }

    /// Record a research session, extract facts and entities from the
    /// answer, and persist them with dedup/merge semantics.
    pub async fn extract_and_store(
        &self,
        user_id: i64,
        answer: &str,
        sources: &[SearchResult],
        question: &str,
        strategy: Strategy,
    ) -> Result<()> {
        let session = ResearchSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            question: question.to_string(),
            strategy: strategy.kind.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.repo.create_session(&session).await?;

        let prompt = Self::build_extraction_prompt(answer, sources);
        let response = self
            .llm
            .complete_with_system(EXTRACTION_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| AppError::Internal(format!("llm extraction: {}", e)))?;

        let extracted = Self::parse_extraction_response(&response)?;

        for fact in &extracted.facts {
            if let Err(err) = self.save_fact(user_id, &session.id, fact).await {
                tracing::warn!(error = %err, content = %fact.content, "failed to save fact");
            }
        }

        for entity in &extracted.entities {
            if let Err(err) = self.save_entity(user_id, &session.id, entity).await {
                tracing::warn!(error = %err, name = %entity.name, "failed to save entity");
            }
        }

        tracing::info!(
            user_id,
            facts = extracted.facts.len(),
            entities = extracted.entities.len(),
            "extracted and stored world model data"
        );

        Ok(())
    }

    /// Totals plus the most recent sessions and entities.
    pub async fn user_knowledge(&self, user_id: i64) -> Result<KnowledgeSummary> {
        let facts = self.repo.get_facts_by_user(user_id, 0).await?;
        let entities = self.repo.get_entities_by_user(user_id).await?;
        let recent_sessions = self.repo.get_recent_sessions(user_id, 10).await?;

        let mut top_entities = entities.clone();
        top_entities.truncate(10);

        Ok(KnowledgeSummary {
            total_facts: facts.len(),
            total_entities: entities.len(),
            recent_sessions,
            top_entities,
        })
    }

    fn build_extraction_prompt(answer: &str, sources: &[SearchResult]) -> String {
        let mut sources_section = String::new();
        if !sources.is_empty() {
            sources_section.push_str("Sources used:\n");
            for src in sources {
                sources_section.push_str(&format!("- {}: {}\n", src.title, src.url));
            }
            sources_section.push('\n');
        }

        format!(
            "Extract key facts and entities from this research answer.\n\n\
Answer:\n{}\n\n\
{}Response format (JSON):\n\
{{\n\
  \"facts\": [\n\
    {{\"content\": \"...\", \"source_url\": \"...\", \"confidence\": 0.9}}\n\
  ],\n\
  \"entities\": [\n\
    {{\"name\": \"Klarna\", \"type\": \"company\", \"attributes\": {{\"founded\": \"2005\"}}}}\n\
  ]\n\
}}\n\n\
Entity types: company, person, concept, product, market",
            answer, sources_section
        )
    }

    /// Parse the extraction JSON, tolerating a triple-fenced wrapper: when
    /// the response opens with a fence, only lines inside the first fenced
    /// block are kept.
    fn parse_extraction_response(response: &str) -> Result<ExtractionResponse> {
        let cleaned = if response.trim_start().starts_with("```") {
            let mut inside = false;
            let mut kept: Vec<&str> = Vec::new();
            for line in response.lines() {
                if line.trim_start().starts_with("```") {
                    inside = !inside;
                    continue;
                }
                if inside {
                    kept.push(line);
                }
            }
            kept.join("\n")
        } else {
            response.to_string()
        };

        serde_json::from_str(&cleaned)
            .map_err(|e| AppError::Internal(format!("parse extraction response: {}", e)))
    }

    async fn save_fact(&self, user_id: i64, session_id: &str, raw: &ExtractedFact) -> Result<()> {
        if raw.content.trim().is_empty() {
            return Ok(());
        }

        // Same content already stored: only link it to this session.
        if let Ok(existing) = self.repo.find_fact_by_content(user_id, &raw.content).await {
            return self.repo.add_fact_to_session(session_id, &existing.id).await;
        }

        let fact = Fact {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            content: raw.content.clone(),
            source_url: if raw.source_url.is_empty() {
                None
            } else {
                Some(raw.source_url.clone())
            },
            confidence: raw.confidence,
            extracted_at: Utc::now(),
        };

        self.repo.create_fact(&fact).await?;
        self.repo.add_fact_to_session(session_id, &fact.id).await
    }

    async fn save_entity(
        &self,
        user_id: i64,
        session_id: &str,
        raw: &ExtractedEntity,
    ) -> Result<()> {
        if raw.name.trim().is_empty() {
            return Ok(());
        }

        let entity_type: EntityType = match raw.entity_type.parse() {
            Ok(t) => t,
            Err(_) => {
                tracing::debug!(
                    name = raw.name,
                    entity_type = raw.entity_type,
                    "skipping entity with invalid type"
                );
                return Ok(());
            }
        };

        if let Ok(mut existing) = self.repo.get_entity_by_name(user_id, &raw.name).await {
            for (key, value) in &raw.attributes {
                existing.attributes.insert(key.clone(), value.clone());
            }
            existing.last_seen_at = Utc::now();

            self.repo.update_entity(&existing).await?;
            return self
                .repo
                .add_entity_to_session(session_id, &existing.id)
                .await;
        }

        let now = Utc::now();
        let entity = Entity {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            name: raw.name.clone(),
            entity_type,
            attributes: raw.attributes.clone(),
            first_seen_at: now,
            last_seen_at: now,
        };

        self.repo.create_entity(&entity).await?;
        self.repo.add_entity_to_session(session_id, &entity.id).await
    }
}

/// Lowercased question tokens with punctuation stripped and stopwords
/// removed.
pub fn extract_keywords(question: &str) -> Vec<String> {
    let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

    question
        .to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| ".,?!;:\"'()[]{}".contains(c)))
        .filter(|word| !word.is_empty() && !stop_words.contains(word))
        .map(String::from)
        .collect()
}
