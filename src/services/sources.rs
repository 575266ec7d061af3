//! Source management: registration, removal, trust, seed import.

use serde::Deserialize;
use std::sync::Arc;

use crate::domain::{Source, TrustLevel, MAX_SOURCES_PER_USER};
use crate::repository::SourceRepository;
use crate::types::{AppError, Result};

/// Curated starter sources imported for new users.
const SEED_SOURCES_JSON: &str = include_str!("seed_sources.json");

#[derive(Debug, Deserialize)]
struct SeedSource {
    url: String,
    name: String,
}

pub struct SourceService {
    repo: Arc<dyn SourceRepository>,
}

impl SourceService {
    pub fn new(repo: Arc<dyn SourceRepository>) -> Self {
        Self { repo }
    }

    /// Register a user-added source with medium trust. The name defaults to
    /// the derived domain.
    pub async fn add(&self, user_id: i64, url: &str) -> Result<Source> {
        let mut source = Source {
            id: 0,
            user_id,
            url: url.to_string(),
            name: String::new(),
            trust_level: TrustLevel::Medium,
            is_user_added: true,
            created_at: chrono::Utc::now(),
        };
        source.validate()?;

        let count = self.repo.count_by_user(user_id).await?;
        if count >= MAX_SOURCES_PER_USER {
            return Err(AppError::SourceLimitReached);
        }

        source.name = source.domain();

        let created = self.repo.create(&source).await?;
        tracing::info!(user_id, url, "source added");
        Ok(created)
    }

    pub async fn remove(&self, user_id: i64, source_id: i64) -> Result<()> {
        self.repo.delete(user_id, source_id).await?;
        tracing::info!(user_id, source_id, "source removed");
        Ok(())
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Source>> {
        self.repo.list_by_user(user_id).await
    }

    /// Import the bundled seed list. Already-registered URLs are skipped;
    /// returns how many were actually added. Seeded sources carry high
    /// trust and are not marked user-added.
    pub async fn import_seed(&self, user_id: i64) -> Result<usize> {
        let seeds: Vec<SeedSource> = serde_json::from_str(SEED_SOURCES_JSON)
            .map_err(|e| AppError::Internal(format!("seed sources: {}", e)))?;

        let mut imported = 0;
        for seed in seeds {
            let exists = match self.repo.exists_by_url(user_id, &seed.url).await {
                Ok(exists) => exists,
                Err(err) => {
                    tracing::warn!(error = %err, url = %seed.url, "failed to check source existence");
                    continue;
                }
            };
            if exists {
                continue;
            }

            let source = Source {
                id: 0,
                user_id,
                url: seed.url.clone(),
                name: seed.name,
                trust_level: TrustLevel::High,
                is_user_added: false,
                created_at: chrono::Utc::now(),
            };

            match self.repo.create(&source).await {
                Ok(_) => imported += 1,
                Err(err) => {
                    tracing::warn!(error = %err, url = %seed.url, "failed to import seed source");
                }
            }
        }

        tracing::info!(user_id, imported, "seed sources imported");
        Ok(imported)
    }

    pub async fn set_trust_level(
        &self,
        user_id: i64,
        source_id: i64,
        level: TrustLevel,
    ) -> Result<()> {
        self.repo.update_trust_level(user_id, source_id, level).await?;
        tracing::info!(user_id, source_id, level = level.as_str(), "trust level updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemorySourceRepository;

    fn service() -> SourceService {
        SourceService::new(Arc::new(MemorySourceRepository::new()))
    }

    #[tokio::test]
    async fn test_add_defaults() {
        let service = service();
        let source = service.add(1, "https://www.example.com/feed").await.unwrap();
        assert_eq!(source.name, "example.com");
        assert_eq!(source.trust_level, TrustLevel::Medium);
        assert!(source.is_user_added);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_url() {
        let service = service();
        assert!(matches!(
            service.add(1, "not-a-url").await,
            Err(AppError::InvalidUrl)
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_duplicates() {
        let service = service();
        service.add(1, "https://example.com").await.unwrap();
        assert!(matches!(
            service.add(1, "https://example.com").await,
            Err(AppError::DuplicateSource)
        ));
    }

    #[tokio::test]
    async fn test_source_limit() {
        let service = service();
        for i in 0..MAX_SOURCES_PER_USER {
            service
                .add(1, &format!("https://site{}.com", i))
                .await
                .unwrap();
        }
        assert!(matches!(
            service.add(1, "https://one-too-many.com").await,
            Err(AppError::SourceLimitReached)
        ));
    }

    #[tokio::test]
    async fn test_seed_import_is_idempotent() {
        let service = service();
        let first = service.import_seed(1).await.unwrap();
        assert!(first > 0);
        let second = service.import_seed(1).await.unwrap();
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn test_seeded_sources_are_high_trust() {
        let service = service();
        service.import_seed(1).await.unwrap();
        let sources = service.list(1).await.unwrap();
        assert!(!sources.is_empty());
        assert!(sources
            .iter()
            .all(|s| s.trust_level == TrustLevel::High && !s.is_user_added));
    }

    #[tokio::test]
    async fn test_set_trust_level() {
        let service = service();
        let source = service.add(1, "https://example.com").await.unwrap();
        service
            .set_trust_level(1, source.id, TrustLevel::Low)
            .await
            .unwrap();
        let sources = service.list(1).await.unwrap();
        assert_eq!(sources[0].trust_level, TrustLevel::Low);
    }
}
