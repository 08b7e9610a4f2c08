use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a user. Duplicate email or username fails with `UserExists`.
    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError>;

    async fn get_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, AuthError>;

    /// Newest users first.
    async fn list(&self, limit: u32, offset: u32) -> Result<Vec<UserRecord>, AuthError>;
}
