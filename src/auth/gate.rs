use crate::application_port::{TokenError, TokenService};
use crate::domain_model::UserId;
use crate::logger::*;
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("token store unavailable: {0}")]
    Unavailable(String),
}

/// Pull the credential out of an `Authorization` value of the exact form
/// `Bearer <token>`.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, GateError> {
    let token = authorization
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .ok_or(GateError::Unauthorized)?;
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(GateError::Unauthorized);
    }
    Ok(token)
}

/// Request guard in front of protected handlers. Never issues or changes
/// tokens.
#[derive(Clone)]
pub struct AuthGate {
    token_service: Arc<dyn TokenService>,
}

impl AuthGate {
    pub fn new(token_service: Arc<dyn TokenService>) -> Self {
        AuthGate { token_service }
    }

    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<UserId, GateError> {
        let token = bearer_token(authorization)?;
        match self.token_service.verify_access(token).await {
            Ok(user_id) => Ok(user_id),
            Err(TokenError::Store(e)) => {
                error!(error = %e, "token store failed during authentication");
                Err(GateError::Unavailable(e))
            }
            Err(_) => Err(GateError::Unauthorized),
        }
    }
}
