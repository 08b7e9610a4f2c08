use super::TokenError;
use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user_id: UserId,
    pub tokens: TokenPair,
}

#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest { page: 1, limit: 10 }
    }
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn register(&self, request: RegisterInput) -> Result<UserRecord, AuthError>;
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    async fn me(&self, user_id: UserId) -> Result<UserRecord, AuthError>;
    async fn list_users(&self, page: PageRequest) -> Result<Vec<UserRecord>, AuthError>;
    async fn logout(&self, user_id: UserId) -> Result<(), AuthError>;
    async fn refresh(
        &self,
        old_access: Option<&str>,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError>;
}
