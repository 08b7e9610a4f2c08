use super::error::*;
use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Public view of an account. The password hash never leaves the server.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        UserProfile {
            user_id: record.user_id,
            username: record.username,
            email: record.email,
            is_superuser: record.is_superuser,
            is_staff: record.is_staff,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

pub async fn register(
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let register_input = RegisterInput {
        email: body.email,
        username: body.username,
        password: body.password,
    };
    let user = auth_service
        .register(register_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(UserProfile::from(user))))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub tokens: TokenPair,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let login_input = LoginInput {
        email: body.email,
        password: body.password,
    };
    let login_result = auth_service
        .login(login_input)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let login_response = LoginResponse {
        user_id: login_result.user_id,
        tokens: login_result.tokens,
    };
    Ok(warp::reply::json(&ApiResponse::ok(login_response)))
}

pub async fn me(
    user_id: UserId,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user = auth_service
        .me(user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(UserProfile::from(user))))
}

pub async fn logout(
    user_id: UserId,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    auth_service
        .logout(user_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(())))
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_users(
    query: UserListQuery,
    _user_id: UserId,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        limit: query.limit.unwrap_or(defaults.limit),
    };
    let users = auth_service
        .list_users(page)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let profiles: Vec<UserProfile> = users.into_iter().map(UserProfile::from).collect();
    Ok(warp::reply::json(&ApiResponse::ok(profiles)))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    body: RefreshRequest,
    old_access: Option<String>,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let tokens = auth_service
        .refresh(old_access.as_deref(), &body.refresh_token)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(tokens)))
}
