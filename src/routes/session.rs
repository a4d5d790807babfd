//! Auth cookie handling
//!
//! The session credential is the JWT from [`crate::token`], carried in
//! an HttpOnly cookie. `AuthUser` is the typed handle handlers take to
//! require authentication; verification is purely cryptographic, no
//! store lookup.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_cookies::cookie::time::Duration as CookieDuration;
use tower_cookies::{Cookie, Cookies};

use crate::error::ServiceError;
use crate::state::AppState;
use crate::store::{Storage, UserId};
use crate::token::TOKEN_TTL_HOURS;

pub const AUTH_COOKIE: &str = "auth_token";

/// Attach a fresh session token to the response.
pub fn set_auth_cookie(cookies: &Cookies, token: String) {
    let cookie = Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .max_age(CookieDuration::hours(TOKEN_TTL_HOURS))
        .build();
    cookies.add(cookie);
}

/// The authenticated caller, resolved from the auth cookie.
///
/// Missing, malformed, or expired credentials reject the request with
/// 401 before the handler runs.
pub struct AuthUser(pub UserId);

impl<S: Storage + 'static> FromRequestParts<Arc<AppState<S>>> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ServiceError::internal(msg))?;

        let token = cookies
            .get(AUTH_COOKIE)
            .ok_or(ServiceError::Unauthorized)?
            .value()
            .to_string();

        let user_id = state.tokens.verify(&token)?;
        Ok(AuthUser(user_id))
    }
}
