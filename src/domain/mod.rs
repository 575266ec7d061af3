//! Core domain types for the research pipeline.
//!
//! Everything here is a plain value type with its own validation; no I/O.
//! Closed sets (strategy kind, trust level, entity type) are enums so that
//! unknown values are rejected at the boundary instead of leaking into
//! storage.

pub mod critic;
pub mod query;
pub mod source;
pub mod strategy;
pub mod worldmodel;

pub use critic::{CriticConfig, CriticResult};
pub use query::{QueryRequest, QueryResponse, SourceRef, MAX_QUERY_LENGTH};
pub use source::{extract_domain, Source, TrustLevel, MAX_SOURCES_PER_USER};
pub use strategy::{Strategy, StrategyKind};
pub use worldmodel::{Entity, EntityType, Fact, ResearchSession};

use chrono::{DateTime, Utc};

/// A registered user, keyed by a stable external principal id.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub principal_id: i64,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}
