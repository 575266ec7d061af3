//! Query request/response types.

use serde::{Deserialize, Serialize};

use crate::domain::{Strategy, TrustLevel};
use crate::types::{AppError, Result};

/// Maximum accepted question length in characters.
pub const MAX_QUERY_LENGTH: usize = 1000;

/// A single research question from a user.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub user_id: i64,
    pub text: String,
    pub strategy: Strategy,
}

impl QueryRequest {
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(AppError::EmptyQuery);
        }
        if self.text.chars().count() > MAX_QUERY_LENGTH {
            return Err(AppError::QueryTooLong);
        }
        self.strategy.validate()
    }

    /// Trim surrounding whitespace and cap the length. Idempotent.
    pub fn sanitize(&mut self) {
        let trimmed = self.text.trim();
        self.text = if trimmed.chars().count() > MAX_QUERY_LENGTH {
            trimmed.chars().take(MAX_QUERY_LENGTH).collect()
        } else {
            trimmed.to_string()
        };
    }
}

/// The answer plus the ranked sources it cites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

/// One cited source. `marker` is the `[Sn]` token used in the answer text;
/// markers are 1-indexed and match the position in the sources list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub marker: String,
    pub title: String,
    pub url: String,
    pub trust_level: TrustLevel,
}
