//! Critic verdicts and review-loop configuration.

use crate::types::{AppError, Result};

/// Outcome of one critic review pass.
#[derive(Debug, Clone, Default)]
pub struct CriticResult {
    pub approved: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    /// Reviewer self-confidence in [0.0, 1.0].
    pub confidence: f64,
}

impl CriticResult {
    pub fn has_critical_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Whether the answer should go through another improvement round.
    /// In strict mode, suggestions alone are enough to trigger one.
    pub fn needs_revision(&self, strict_mode: bool) -> bool {
        !self.approved || !self.issues.is_empty() || (strict_mode && !self.suggestions.is_empty())
    }
}

/// Bounds for the review/improve loop.
#[derive(Debug, Clone, Copy)]
pub struct CriticConfig {
    /// Improvement rounds allowed after the first review, in [0, 10].
    pub max_retries: usize,
    pub strict_mode: bool,
}

impl CriticConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries > 10 {
            return Err(AppError::InvalidMaxRetries);
        }
        Ok(())
    }
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            strict_mode: false,
        }
    }
}
