//! Persistence traits and their backends.
//!
//! Services depend only on these traits; the in-memory backend keeps tests
//! and local runs self-contained, the libsql backend provides the durable
//! relational store.

pub mod libsql;
pub mod memory;

pub use self::libsql::LibsqlRepositories;
pub use self::memory::{MemorySourceRepository, MemoryUserRepository, MemoryWorldModelRepository};

use async_trait::async_trait;

use crate::domain::{Entity, Fact, ResearchSession, Source, TrustLevel, User};
use crate::types::Result;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up by principal, creating on first contact. A changed display
    /// name is persisted.
    async fn get_or_create(&self, principal_id: i64, display_name: &str) -> Result<User>;
    async fn get_by_id(&self, id: i64) -> Result<User>;
    async fn get_by_principal(&self, principal_id: i64) -> Result<User>;
    async fn update(&self, user: &User) -> Result<()>;
    async fn create(&self, user: &User) -> Result<User>;
}

#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Insert; (user, url) duplicates are rejected.
    async fn create(&self, source: &Source) -> Result<Source>;
    async fn delete(&self, user_id: i64, source_id: i64) -> Result<()>;
    /// Newest first.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Source>>;
    async fn get_by_id(&self, source_id: i64) -> Result<Source>;
    async fn exists_by_url(&self, user_id: i64, url: &str) -> Result<bool>;
    async fn count_by_user(&self, user_id: i64) -> Result<usize>;
    /// Distinct derived domains, empty ones skipped.
    async fn get_domains_by_user(&self, user_id: i64) -> Result<Vec<String>>;
    async fn update_trust_level(
        &self,
        user_id: i64,
        source_id: i64,
        level: TrustLevel,
    ) -> Result<()>;
}

#[async_trait]
pub trait WorldModelRepository: Send + Sync {
    // Facts
    async fn create_fact(&self, fact: &Fact) -> Result<()>;
    /// Newest first; `limit` 0 means no limit.
    async fn get_facts_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<Fact>>;
    async fn get_facts_by_session(&self, session_id: &str) -> Result<Vec<Fact>>;
    /// Keyword retrieval: facts whose content contains the query text.
    async fn search_facts(&self, user_id: i64, query: &str) -> Result<Vec<Fact>>;
    /// Exact-content lookup; absent content is `NotFound`.
    async fn find_fact_by_content(&self, user_id: i64, content: &str) -> Result<Fact>;

    // Entities
    async fn create_entity(&self, entity: &Entity) -> Result<()>;
    async fn get_entity_by_name(&self, user_id: i64, name: &str) -> Result<Entity>;
    async fn get_entities_by_user(&self, user_id: i64) -> Result<Vec<Entity>>;
    /// Replaces the entity row and its attributes atomically.
    async fn update_entity(&self, entity: &Entity) -> Result<()>;

    // Research sessions
    async fn create_session(&self, session: &ResearchSession) -> Result<()>;
    /// Newest first.
    async fn get_recent_sessions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ResearchSession>>;
    /// Idempotent.
    async fn add_fact_to_session(&self, session_id: &str, fact_id: &str) -> Result<()>;
    /// Idempotent.
    async fn add_entity_to_session(&self, session_id: &str, entity_id: &str) -> Result<()>;
}
