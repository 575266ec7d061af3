//! O.R.I.O.N. - Orchestrated Research Intelligence Over Networks
//!
//! A research assistant server that answers questions from a user's own
//! trusted sources: LLM query expansion, cached parallel web search,
//! multi-expert analysis with synthesis, critic-gated revision, and a
//! per-user world model fed by background knowledge extraction.

pub mod agents;
pub mod api;
pub mod cache;
pub mod chat;
pub mod domain;
pub mod llm;
pub mod metrics;
pub mod ratelimit;
pub mod repository;
pub mod research;
pub mod search;
pub mod services;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use llm::{LLMClient, Provider};
pub use research::QueryOrchestrator;
pub use types::{AppError, Result};

use crate::{
    metrics::Metrics, ratelimit::RateLimiter, research::WorldModelService,
    services::{SourceService, UserService}, utils::config::Config,
};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<QueryOrchestrator>,
    pub users: Arc<UserService>,
    pub sources: Arc<SourceService>,
    pub world_model: Option<Arc<WorldModelService>>,
    pub rate_limiter: Arc<RateLimiter>,
    pub metrics: Arc<Metrics>,
}
