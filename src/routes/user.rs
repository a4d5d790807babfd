//! Registration and login endpoints

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tower_cookies::Cookies;

use super::session;
use crate::error::ServiceError;
use crate::state::AppState;
use crate::store::Storage;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub login: String,
    pub password: String,
}

/// POST /api/user/register
///
/// 200 registers and authenticates in one step; 409 when the login is
/// taken.
pub async fn register<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    cookies: Cookies,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<StatusCode, ServiceError> {
    let Json(req) = payload.map_err(|_| ServiceError::InvalidRequest)?;

    let user = state.users.register(&req.login, &req.password)?;

    let token = state.tokens.issue(user.id)?;
    session::set_auth_cookie(&cookies, token);

    Ok(StatusCode::OK)
}

/// POST /api/user/login
pub async fn login<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    cookies: Cookies,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<StatusCode, ServiceError> {
    let Json(req) = payload.map_err(|_| ServiceError::InvalidRequest)?;

    let token = state.users.login(&req.login, &req.password)?;
    session::set_auth_cookie(&cookies, token);

    Ok(StatusCode::OK)
}
