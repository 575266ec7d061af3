//! User lookup and registration.

use std::sync::Arc;

use crate::domain::User;
use crate::repository::UserRepository;
use crate::types::Result;

pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    /// Resolve the principal to a user, registering on first contact.
    pub async fn get_or_create(&self, principal_id: i64, display_name: &str) -> Result<User> {
        let user = self.repo.get_or_create(principal_id, display_name).await?;
        tracing::debug!(
            user_id = user.id,
            principal_id,
            "resolved user"
        );
        Ok(user)
    }

    pub async fn get_by_principal(&self, principal_id: i64) -> Result<User> {
        self.repo.get_by_principal(principal_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryUserRepository;
    use crate::types::AppError;

    #[tokio::test]
    async fn test_get_or_create_roundtrip() {
        let service = UserService::new(Arc::new(MemoryUserRepository::new()));

        let created = service.get_or_create(1001, "ada").await.unwrap();
        let fetched = service.get_by_principal(1001).await.unwrap();
        assert_eq!(created.id, fetched.id);
        assert_eq!(fetched.display_name, "ada");
    }

    #[tokio::test]
    async fn test_unknown_principal_not_found() {
        let service = UserService::new(Arc::new(MemoryUserRepository::new()));
        assert!(matches!(
            service.get_by_principal(9).await,
            Err(AppError::UserNotFound)
        ));
    }
}
