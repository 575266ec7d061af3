//! Research strategies: named bundles of search and analysis budgets.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::{AppError, Result};

/// The closed set of strategy kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Quick,
    Standard,
    Deep,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Quick => "quick",
            StrategyKind::Standard => "standard",
            StrategyKind::Deep => "deep",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "quick" => Ok(StrategyKind::Quick),
            "standard" => Ok(StrategyKind::Standard),
            "deep" => Ok(StrategyKind::Deep),
            _ => Err(AppError::InvalidStrategy),
        }
    }
}

/// Immutable budget bundle applied to a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub kind: StrategyKind,
    pub max_queries: usize,
    pub max_results: usize,
    pub max_analysis_iterations: usize,
    pub use_critic: bool,
    pub timeout_seconds: u64,
}

impl Strategy {
    pub fn quick() -> Self {
        Self {
            kind: StrategyKind::Quick,
            max_queries: 1,
            max_results: 5,
            max_analysis_iterations: 1,
            use_critic: false,
            timeout_seconds: 30,
        }
    }

    pub fn standard() -> Self {
        Self {
            kind: StrategyKind::Standard,
            max_queries: 3,
            max_results: 15,
            max_analysis_iterations: 1,
            use_critic: true,
            timeout_seconds: 60,
        }
    }

    pub fn deep() -> Self {
        Self {
            kind: StrategyKind::Deep,
            max_queries: 5,
            max_results: 30,
            max_analysis_iterations: 3,
            use_critic: true,
            timeout_seconds: 180,
        }
    }

    pub fn for_kind(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Quick => Self::quick(),
            StrategyKind::Standard => Self::standard(),
            StrategyKind::Deep => Self::deep(),
        }
    }

    /// Check that every budget lies in its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.max_queries < 1 || self.max_queries > 10 {
            return Err(AppError::InvalidMaxQueries);
        }
        if self.max_results < 1 || self.max_results > 100 {
            return Err(AppError::InvalidMaxResults);
        }
        if self.max_analysis_iterations < 1 {
            return Err(AppError::InvalidAnalysisIterations);
        }
        if self.timeout_seconds < 1 {
            return Err(AppError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::standard()
    }
}
