//! Cookie-carried sessions.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use coursehub_core::models::User;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "token";

/// The signed-in user, resolved from the session cookie. Rejects with 401
/// when the cookie is absent, invalid, expired, or names a deleted user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_owned())
            .ok_or(ApiError::Unauthorized)?;

        let user = state.users().authenticate(&token).await?;
        Ok(CurrentUser(user))
    }
}

fn same_site(config: &AppConfig) -> SameSite {
    if config.production {
        SameSite::None
    } else {
        SameSite::Lax
    }
}

/// `HttpOnly` cookie holding `token`, living as long as the token does.
pub fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(config.production)
        .same_site(same_site(config))
        .max_age(time::Duration::hours(config.token_ttl_hours))
        .build()
}

/// Already-expired cookie that overwrites the session on the client, whether
/// or not the request carried one.
pub fn cleared_session_cookie(config: &AppConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE)
        .path("/")
        .http_only(true)
        .secure(config.production)
        .same_site(same_site(config))
        .build();
    cookie.make_removal();
    cookie
}
