use std::sync::Arc;

use tracing::{info, instrument};

use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::user::{
    PASSWORD_MIN_CHARS, USERNAME_MAX_CHARS, USERNAME_MIN_CHARS, User, UserId,
};
use crate::infrastructure::security::{JwtKeys, hash_password, verify_password};

#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn UserRepository>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(repo: Arc<dyn UserRepository>, keys: JwtKeys) -> Self {
        Self { repo, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::UserNotFound(id))
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<User, DomainError> {
        let username = username.trim();
        let len = username.chars().count();
        if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
            return Err(DomainError::Validation(format!(
                "username must be {USERNAME_MIN_CHARS}..={USERNAME_MAX_CHARS} characters"
            )));
        }
        if password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(DomainError::Validation(format!(
                "password must be at least {PASSWORD_MIN_CHARS} characters"
            )));
        }
        let hash =
            hash_password(password).map_err(|err| DomainError::Internal(err.to_string()))?;
        self.repo.create(username, &hash).await
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<String, DomainError> {
        let user = self
            .repo
            .find_by_username(username.trim())
            .await?
            .ok_or(DomainError::Unauthorized)?;

        let valid = verify_password(password, &user.password_hash)
            .map_err(|_| DomainError::Unauthorized)?;
        if !valid {
            return Err(DomainError::Unauthorized);
        }

        info!(user_id = user.id, "user logged in");
        self.issue_token(user.id)
    }

    pub fn issue_token(&self, user_id: UserId) -> Result<String, DomainError> {
        self.keys
            .generate_token(user_id)
            .map_err(|err| DomainError::Internal(err.to_string()))
    }

    /// Removes the account and everything it authored.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId) -> Result<(), DomainError> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(DomainError::UserNotFound(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Repositories;

    fn service() -> AuthService {
        AuthService::new(
            Repositories::in_memory().users,
            JwtKeys::new("test-secret".into()),
        )
    }

    #[tokio::test]
    async fn registered_user_can_log_in() {
        let auth = service();
        let user = auth.register("smith", "nopassword").await.unwrap();
        let token = auth.login("smith", "nopassword").await.unwrap();
        let claims = auth.keys().verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let auth = service();
        auth.register("smith", "nopassword").await.unwrap();
        assert!(matches!(
            auth.login("smith", "yespassword").await,
            Err(DomainError::Unauthorized)
        ));
        assert!(matches!(
            auth.login("nobody", "nopassword").await,
            Err(DomainError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn registration_validates_and_rejects_duplicates() {
        let auth = service();
        assert!(matches!(
            auth.register("ab", "nopassword").await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            auth.register("smith", "short").await,
            Err(DomainError::Validation(_))
        ));
        auth.register("smith", "nopassword").await.unwrap();
        assert!(matches!(
            auth.register("smith", "nopassword").await,
            Err(DomainError::UserAlreadyExists(_))
        ));
    }
}
