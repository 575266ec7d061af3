//! User-registered sources and their trust levels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::{AppError, Result};

/// Hard cap on sources per user.
pub const MAX_SOURCES_PER_USER: usize = 100;

/// Trust attached to a source and carried into answer citations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    High,
    Medium,
    Low,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::High => "high",
            TrustLevel::Medium => "medium",
            TrustLevel::Low => "low",
        }
    }
}

impl FromStr for TrustLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(TrustLevel::High),
            "medium" => Ok(TrustLevel::Medium),
            "low" => Ok(TrustLevel::Low),
            _ => Err(AppError::InvalidTrustLevel),
        }
    }
}

/// A web source a user has registered (or had seeded) for research.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub user_id: i64,
    pub url: String,
    pub name: String,
    pub trust_level: TrustLevel,
    pub is_user_added: bool,
    pub created_at: DateTime<Utc>,
}

impl Source {
    /// Accepts only http/https URLs with a non-empty host.
    pub fn validate(&self) -> Result<()> {
        if extract_host(&self.url).is_none() {
            return Err(AppError::InvalidUrl);
        }
        Ok(())
    }

    /// Host component of the URL, with any `www.` prefix stripped.
    /// Returns an empty string for unparseable URLs.
    pub fn domain(&self) -> String {
        extract_domain(&self.url)
    }
}

fn extract_host(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host = rest.split('/').next().unwrap_or("");
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Domain for an arbitrary URL, used to map search results back to the
/// user's trust levels. Empty string when the URL has no recognizable host.
pub fn extract_domain(url: &str) -> String {
    match extract_host(url) {
        Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str) -> Source {
        Source {
            id: 1,
            user_id: 1,
            url: url.to_string(),
            name: String::new(),
            trust_level: TrustLevel::Medium,
            is_user_added: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_accepts_http_and_https() {
        assert!(source("https://example.com").validate().is_ok());
        assert!(source("http://example.com/path").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        assert!(source("").validate().is_err());
        assert!(source("ftp://example.com").validate().is_err());
        assert!(source("://invalid").validate().is_err());
        assert!(source("https://").validate().is_err());
        assert!(source("example.com").validate().is_err());
    }

    #[test]
    fn test_domain_strips_www() {
        assert_eq!(source("https://www.example.com/a").domain(), "example.com");
        assert_eq!(source("https://example.com").domain(), "example.com");
    }

    #[test]
    fn test_domain_keeps_port() {
        assert_eq!(source("http://host:8080/x").domain(), "host:8080");
    }

    #[test]
    fn test_extract_domain_invalid() {
        assert_eq!(extract_domain("://invalid"), "");
        assert_eq!(extract_domain(""), "");
    }

    #[test]
    fn test_trust_level_parsing() {
        assert_eq!("high".parse::<TrustLevel>().unwrap(), TrustLevel::High);
        assert_eq!("medium".parse::<TrustLevel>().unwrap(), TrustLevel::Medium);
        assert_eq!("low".parse::<TrustLevel>().unwrap(), TrustLevel::Low);
        assert!("trusted".parse::<TrustLevel>().is_err());
    }
}
