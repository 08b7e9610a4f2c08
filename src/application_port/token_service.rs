use crate::domain_model::*;
use crate::domain_port::TokenCacheError;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("signature does not match")]
    BadSignature,
    #[error("unexpected signing algorithm")]
    AlgorithmMismatch,
    #[error("malformed token: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Decode failure, expiry and cache miss all collapse here so callers
    /// cannot tell forged, expired and revoked tokens apart.
    #[error("token invalid")]
    Invalid,
    #[error("refresh token rejected")]
    Rotation,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<TokenCacheError> for TokenError {
    fn from(error: TokenCacheError) -> Self {
        TokenError::Store(error.to_string())
    }
}

pub trait TokenCodec: Send + Sync {
    fn encode(&self, subject: UserId, ttl: Duration) -> Result<IssuedToken, TokenError>;
    fn decode(&self, token: &str) -> Result<ClaimSet, DecodeError>;
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    async fn issue_pair(&self, subject: UserId) -> Result<TokenPair, TokenError>;
    async fn verify_access(&self, token: &str) -> Result<UserId, TokenError>;
    async fn rotate(&self, old_access: &str, refresh_token: &str)
    -> Result<TokenPair, TokenError>;
    async fn revoke_all(&self, subject: UserId) -> Result<(), TokenError>;
}
