//! World-model entities: facts, named entities, and research sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::types::{AppError, Result};

/// A fact extracted from a research answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub id: String,
    pub user_id: i64,
    pub content: String,
    pub source_url: Option<String>,
    pub confidence: f64,
    pub extracted_at: DateTime<Utc>,
}

impl Fact {
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(AppError::EmptyContent);
        }
        Ok(())
    }
}

/// Closed set of entity kinds the extractor may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Company,
    Person,
    Concept,
    Product,
    Market,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Company => "company",
            EntityType::Person => "person",
            EntityType::Concept => "concept",
            EntityType::Product => "product",
            EntityType::Market => "market",
        }
    }
}

impl FromStr for EntityType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "company" => Ok(EntityType::Company),
            "person" => Ok(EntityType::Person),
            "concept" => Ok(EntityType::Concept),
            "product" => Ok(EntityType::Product),
            "market" => Ok(EntityType::Market),
            _ => Err(AppError::InvalidEntityType),
        }
    }
}

/// A named entity with free-form attributes. Unique per (user, name);
/// re-ingesting merges attributes and advances `last_seen_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub user_id: i64,
    pub name: String,
    pub entity_type: EntityType,
    pub attributes: HashMap<String, String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl Entity {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::EmptyEntityName);
        }
        Ok(())
    }
}

/// One orchestrated research run; links the facts and entities it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSession {
    pub id: String,
    pub user_id: i64,
    pub question: String,
    pub strategy: String,
    pub created_at: DateTime<Utc>,
}

impl ResearchSession {
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(AppError::EmptyQuestion);
        }
        Ok(())
    }
}
