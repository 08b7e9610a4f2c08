use crate::api::v1::handler::ApiResponse;
use crate::application_port::*;
use crate::auth::GateError;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let code = if let Some(code) = err.find::<ApiErrorCode>() {
        code.clone()
    } else if err.is_not_found() {
        ApiErrorCode::NotFound
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        debug!("rejected body: {}", e);
        ApiErrorCode::InvalidInput
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        debug!("rejected query: {}", e);
        ApiErrorCode::InvalidInput
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some()
        || err.find::<warp::reject::PayloadTooLarge>().is_some()
    {
        ApiErrorCode::InvalidInput
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        ApiErrorCode::NotFound
    } else {
        ApiErrorCode::internal(format!("unhandled rejection: {:?}", err))
    };

    let json = warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string()));
    Ok(warp::reply::with_status(json, code.status()))
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid request")]
    InvalidInput,
    #[error("Email or username already registered")]
    UserExists,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Refresh token is not valid")]
    InvalidRefreshToken,
    #[error("Authentication required")]
    Unauthorized,
    #[error("User not found")]
    UserNotFound,
    #[error("Not found")]
    NotFound,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidInput
            | ApiErrorCode::UserExists
            | ApiErrorCode::InvalidCredentials
            | ApiErrorCode::InvalidRefreshToken => StatusCode::BAD_REQUEST,
            ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiErrorCode::UserNotFound | ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<TokenError> for ApiErrorCode {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::Invalid => ApiErrorCode::Unauthorized,
            TokenError::Rotation => ApiErrorCode::InvalidRefreshToken,
            TokenError::Store(e) => ApiErrorCode::internal(e),
            TokenError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::UserExists => ApiErrorCode::UserExists,
            AuthError::UserNotFound => ApiErrorCode::UserNotFound,
            AuthError::Validation(reason) => {
                debug!(%reason, "request failed validation");
                ApiErrorCode::InvalidInput
            }
            AuthError::Token(e) => ApiErrorCode::from(e),
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}

impl From<GateError> for ApiErrorCode {
    fn from(error: GateError) -> Self {
        match error {
            GateError::Unauthorized => ApiErrorCode::Unauthorized,
            GateError::Unavailable(e) => ApiErrorCode::internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_refresh_is_a_bad_request_not_unauthorized() {
        let code = ApiErrorCode::from(AuthError::Token(TokenError::Rotation));
        assert_eq!(code, ApiErrorCode::InvalidRefreshToken);
        assert_eq!(code.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failures_surface_as_internal() {
        let from_gate = ApiErrorCode::from(GateError::Unavailable("down".to_string()));
        let from_auth = ApiErrorCode::from(AuthError::Token(TokenError::Store("down".to_string())));
        assert_eq!(from_gate.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(from_auth.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn account_errors_map_to_client_statuses() {
        assert_eq!(
            ApiErrorCode::from(AuthError::UserExists).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiErrorCode::from(AuthError::Validation("short".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiErrorCode::from(AuthError::UserNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiErrorCode::from(GateError::Unauthorized).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
