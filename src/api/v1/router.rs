use super::error::*;
use super::handler;
use super::handler::UserListQuery;
use crate::auth::*;
use crate::domain_model::UserId;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, http, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let register = warp::post()
        .and(warp::path("user"))
        .and(warp::path("registration"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::post()
        .and(warp::path("user"))
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let me = warp::get()
        .and(warp::path("user"))
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(with_verification(server.auth_gate.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::me);

    let logout = warp::post()
        .and(warp::path("user"))
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(with_verification(server.auth_gate.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let list_users = warp::get()
        .and(warp::path("user"))
        .and(warp::path::end())
        .and(warp::query::<UserListQuery>())
        .and(with_verification(server.auth_gate.clone()))
        .and(with(server.auth_service.clone()))
        .and_then(handler::list_users);

    // Not gated: the access token being replaced is usually already expired.
    let refresh = warp::post()
        .and(warp::path("user"))
        .and(warp::path("token"))
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(optional_bearer())
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    register
        .or(login)
        .or(me)
        .or(logout)
        .or(list_users)
        .or(refresh)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_verification(
    auth_gate: AuthGate,
) -> impl Filter<Extract = (UserId,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_ref()).and_then(
        move |authorization: Option<String>| {
            let auth_gate = auth_gate.clone();
            async move {
                auth_gate
                    .authenticate(authorization.as_deref())
                    .await
                    .map_err(ApiErrorCode::from)
                    .map_err(reject::custom)
            }
        },
    )
}

/// The caller's current access token, if it sent a well-formed one.
fn optional_bearer() -> impl Filter<Extract = (Option<String>,), Error = warp::Rejection> + Clone
{
    warp::header::optional::<String>(http::header::AUTHORIZATION.as_ref()).map(
        |authorization: Option<String>| {
            bearer_token(authorization.as_deref())
                .ok()
                .map(str::to_string)
        },
    )
}
