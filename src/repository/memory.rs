//! In-memory repository backends.
//!
//! Lock-guarded maps with the same contracts as the relational backend.
//! Used for tests and for running the server without a database.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::domain::{Entity, Fact, ResearchSession, Source, TrustLevel, User};
use crate::repository::{SourceRepository, UserRepository, WorldModelRepository};
use crate::types::{AppError, Result};

// ============= Users =============

pub struct MemoryUserRepository {
    users: RwLock<HashMap<i64, User>>, // keyed by principal_id
    next_id: AtomicI64,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn get_or_create(&self, principal_id: i64, display_name: &str) -> Result<User> {
        let mut users = self.users.write();

        if let Some(user) = users.get_mut(&principal_id) {
            if user.display_name != display_name {
                user.display_name = display_name.to_string();
            }
            return Ok(user.clone());
        }

        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            principal_id,
            display_name: display_name.to_string(),
            created_at: Utc::now(),
        };
        users.insert(principal_id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: i64) -> Result<User> {
        self.users
            .read()
            .values()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(AppError::UserNotFound)
    }

    async fn get_by_principal(&self, principal_id: i64) -> Result<User> {
        self.users
            .read()
            .get(&principal_id)
            .cloned()
            .ok_or(AppError::UserNotFound)
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut users = self.users.write();
        if !users.contains_key(&user.principal_id) {
            return Err(AppError::UserNotFound);
        }
        users.insert(user.principal_id, user.clone());
        Ok(())
    }

    async fn create(&self, user: &User) -> Result<User> {
        let mut users = self.users.write();
        if users.contains_key(&user.principal_id) {
            return Err(AppError::Internal("principal already exists".to_string()));
        }
        let mut user = user.clone();
        user.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        user.created_at = Utc::now();
        users.insert(user.principal_id, user.clone());
        Ok(user)
    }
}

// ============= Sources =============

pub struct MemorySourceRepository {
    sources: RwLock<HashMap<i64, Source>>, // keyed by source id
    next_id: AtomicI64,
}

impl MemorySourceRepository {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl SourceRepository for MemorySourceRepository {
    async fn create(&self, source: &Source) -> Result<Source> {
        let mut sources = self.sources.write();

        let duplicate = sources
            .values()
            .any(|s| s.user_id == source.user_id && s.url == source.url);
        if duplicate {
            return Err(AppError::DuplicateSource);
        }

        let mut source = source.clone();
        source.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        source.created_at = Utc::now();
        sources.insert(source.id, source.clone());
        Ok(source)
    }

    async fn delete(&self, user_id: i64, source_id: i64) -> Result<()> {
        let mut sources = self.sources.write();
        match sources.get(&source_id) {
            Some(s) if s.user_id == user_id => {
                sources.remove(&source_id);
                Ok(())
            }
            _ => Err(AppError::SourceNotFound),
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Source>> {
        let mut result: Vec<Source> = self
            .sources
            .read()
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        // Newest first; id breaks creation-time ties deterministically.
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }

    async fn get_by_id(&self, source_id: i64) -> Result<Source> {
        self.sources
            .read()
            .get(&source_id)
            .cloned()
            .ok_or(AppError::SourceNotFound)
    }

    async fn exists_by_url(&self, user_id: i64, url: &str) -> Result<bool> {
        Ok(self
            .sources
            .read()
            .values()
            .any(|s| s.user_id == user_id && s.url == url))
    }

    async fn count_by_user(&self, user_id: i64) -> Result<usize> {
        Ok(self
            .sources
            .read()
            .values()
            .filter(|s| s.user_id == user_id)
            .count())
    }

    async fn get_domains_by_user(&self, user_id: i64) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut domains = Vec::new();
        for source in self.sources.read().values() {
            if source.user_id != user_id {
                continue;
            }
            let domain = source.domain();
            if !domain.is_empty() && seen.insert(domain.clone()) {
                domains.push(domain);
            }
        }
        Ok(domains)
    }

    async fn update_trust_level(
        &self,
        user_id: i64,
        source_id: i64,
        level: TrustLevel,
    ) -> Result<()> {
        let mut sources = self.sources.write();
        match sources.get_mut(&source_id) {
            Some(s) if s.user_id == user_id => {
                s.trust_level = level;
                Ok(())
            }
            _ => Err(AppError::SourceNotFound),
        }
    }
}

// ============= World model =============

#[derive(Default)]
struct WorldModelState {
    facts: HashMap<String, Fact>,
    entities: HashMap<String, Entity>,
    sessions: HashMap<String, ResearchSession>,
    session_facts: HashMap<String, Vec<String>>,
    session_entities: HashMap<String, Vec<String>>,
}

#[derive(Default)]
pub struct MemoryWorldModelRepository {
    state: RwLock<WorldModelState>,
}

impl MemoryWorldModelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of facts attached to a session (test support).
    pub fn session_fact_count(&self, session_id: &str) -> usize {
        self.state
            .read()
            .session_facts
            .get(session_id)
            .map(|f| f.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl WorldModelRepository for MemoryWorldModelRepository {
    async fn create_fact(&self, fact: &Fact) -> Result<()> {
        fact.validate()?;
        self.state
            .write()
            .facts
            .insert(fact.id.clone(), fact.clone());
        Ok(())
    }

    async fn get_facts_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<Fact>> {
        let mut facts: Vec<Fact> = self
            .state
            .read()
            .facts
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        facts.sort_by(|a, b| b.extracted_at.cmp(&a.extracted_at));
        if limit > 0 {
            facts.truncate(limit);
        }
        Ok(facts)
    }

    async fn get_facts_by_session(&self, session_id: &str) -> Result<Vec<Fact>> {
        let state = self.state.read();
        let ids = state.session_facts.get(session_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| state.facts.get(id).cloned())
            .collect())
    }

    async fn search_facts(&self, user_id: i64, query: &str) -> Result<Vec<Fact>> {
        let needle = query.to_lowercase();
        Ok(self
            .state
            .read()
            .facts
            .values()
            .filter(|f| f.user_id == user_id && f.content.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn find_fact_by_content(&self, user_id: i64, content: &str) -> Result<Fact> {
        self.state
            .read()
            .facts
            .values()
            .find(|f| f.user_id == user_id && f.content == content)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn create_entity(&self, entity: &Entity) -> Result<()> {
        entity.validate()?;
        let mut state = self.state.write();
        let duplicate = state
            .entities
            .values()
            .any(|e| e.user_id == entity.user_id && e.name == entity.name);
        if duplicate {
            return Err(AppError::Internal("entity already exists".to_string()));
        }
        state.entities.insert(entity.id.clone(), entity.clone());
        Ok(())
    }

    async fn get_entity_by_name(&self, user_id: i64, name: &str) -> Result<Entity> {
        self.state
            .read()
            .entities
            .values()
            .find(|e| e.user_id == user_id && e.name == name)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn get_entities_by_user(&self, user_id: i64) -> Result<Vec<Entity>> {
        let mut entities: Vec<Entity> = self
            .state
            .read()
            .entities
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entities.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));
        Ok(entities)
    }

    async fn update_entity(&self, entity: &Entity) -> Result<()> {
        let mut state = self.state.write();
        if !state.entities.contains_key(&entity.id) {
            return Err(AppError::NotFound);
        }
        state.entities.insert(entity.id.clone(), entity.clone());
        Ok(())
    }

    async fn create_session(&self, session: &ResearchSession) -> Result<()> {
        session.validate()?;
        self.state
            .write()
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_recent_sessions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ResearchSession>> {
        let mut sessions: Vec<ResearchSession> = self
            .state
            .read()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if limit > 0 {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    async fn add_fact_to_session(&self, session_id: &str, fact_id: &str) -> Result<()> {
        let mut state = self.state.write();
        let facts = state.session_facts.entry(session_id.to_string()).or_default();
        if !facts.iter().any(|id| id == fact_id) {
            facts.push(fact_id.to_string());
        }
        Ok(())
    }

    async fn add_entity_to_session(&self, session_id: &str, entity_id: &str) -> Result<()> {
        let mut state = self.state.write();
        let entities = state
            .session_entities
            .entry(session_id.to_string())
            .or_default();
        if !entities.iter().any(|id| id == entity_id) {
            entities.push(entity_id.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityType;
    use std::collections::HashMap as Map;

    #[tokio::test]
    async fn test_user_get_or_create_is_stable() {
        let repo = MemoryUserRepository::new();
        let first = repo.get_or_create(42, "ada").await.unwrap();
        let second = repo.get_or_create(42, "ada").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_user_display_name_updates() {
        let repo = MemoryUserRepository::new();
        repo.get_or_create(42, "old").await.unwrap();
        let updated = repo.get_or_create(42, "new").await.unwrap();
        assert_eq!(updated.display_name, "new");
    }

    #[tokio::test]
    async fn test_source_duplicate_rejected() {
        let repo = MemorySourceRepository::new();
        let source = Source {
            id: 0,
            user_id: 1,
            url: "https://example.com".to_string(),
            name: "example".to_string(),
            trust_level: TrustLevel::Medium,
            is_user_added: true,
            created_at: Utc::now(),
        };
        repo.create(&source).await.unwrap();
        assert!(matches!(
            repo.create(&source).await,
            Err(AppError::DuplicateSource)
        ));
    }

    #[tokio::test]
    async fn test_source_delete_checks_owner() {
        let repo = MemorySourceRepository::new();
        let source = Source {
            id: 0,
            user_id: 1,
            url: "https://example.com".to_string(),
            name: String::new(),
            trust_level: TrustLevel::Medium,
            is_user_added: true,
            created_at: Utc::now(),
        };
        let created = repo.create(&source).await.unwrap();
        assert!(matches!(
            repo.delete(2, created.id).await,
            Err(AppError::SourceNotFound)
        ));
        repo.delete(1, created.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_domains_are_distinct_and_skip_empty() {
        let repo = MemorySourceRepository::new();
        for url in [
            "https://www.example.com/a",
            "https://example.com/b",
            "https://other.org",
        ] {
            let source = Source {
                id: 0,
                user_id: 1,
                url: url.to_string(),
                name: String::new(),
                trust_level: TrustLevel::Medium,
                is_user_added: true,
                created_at: Utc::now(),
            };
            repo.create(&source).await.unwrap();
        }
        let mut domains = repo.get_domains_by_user(1).await.unwrap();
        domains.sort();
        assert_eq!(domains, vec!["example.com", "other.org"]);
    }

    #[tokio::test]
    async fn test_find_fact_by_content_absent_is_not_found() {
        let repo = MemoryWorldModelRepository::new();
        assert!(matches!(
            repo.find_fact_by_content(1, "nothing").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_search_facts_substring() {
        let repo = MemoryWorldModelRepository::new();
        let fact = Fact {
            id: "f1".to_string(),
            user_id: 1,
            content: "Open banking adoption grew in Europe".to_string(),
            source_url: None,
            confidence: 0.9,
            extracted_at: Utc::now(),
        };
        repo.create_fact(&fact).await.unwrap();

        assert_eq!(repo.search_facts(1, "banking").await.unwrap().len(), 1);
        assert_eq!(repo.search_facts(1, "BANKING").await.unwrap().len(), 1);
        assert!(repo.search_facts(1, "crypto").await.unwrap().is_empty());
        assert!(repo.search_facts(2, "banking").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_links_idempotent() {
        let repo = MemoryWorldModelRepository::new();
        repo.add_fact_to_session("s1", "f1").await.unwrap();
        repo.add_fact_to_session("s1", "f1").await.unwrap();
        assert_eq!(repo.session_fact_count("s1"), 1);
    }

    #[tokio::test]
    async fn test_entity_unique_per_user_name() {
        let repo = MemoryWorldModelRepository::new();
        let entity = Entity {
            id: "e1".to_string(),
            user_id: 1,
            name: "Stripe".to_string(),
            entity_type: EntityType::Company,
            attributes: Map::new(),
            first_seen_at: Utc::now(),
            last_seen_at: Utc::now(),
        };
        repo.create_entity(&entity).await.unwrap();

        let dup = Entity {
            id: "e2".to_string(),
            ..entity
        };
        assert!(repo.create_entity(&dup).await.is_err());
    }
}
