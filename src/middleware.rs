use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use axum_extra::extract::CookieJar;
use tracing::warn;

use crate::error::AppError;
use crate::models::Claims;
use crate::AppState;

pub const TOKEN_COOKIE: &str = "token";

/// Gate for the todo routes. Carries no claims when authentication is
/// switched off.
pub struct Auth(pub Option<Claims>);

/// Always requires a valid token, regardless of configuration.
pub struct TokenAuth(pub Claims);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !state.require_auth {
            return Ok(Auth(None));
        }
        Ok(Auth(Some(check_token(parts, state)?)))
    }
}

impl FromRequestParts<AppState> for TokenAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(TokenAuth(check_token(parts, state)?))
    }
}

fn check_token(parts: &Parts, state: &AppState) -> Result<Claims, AppError> {
    let Some(token) = bearer_token(parts).or_else(|| cookie_token(parts)) else {
        warn!("Unauthorized API access attempt");
        return Err(AppError::Unauthorized);
    };

    state.auth.authenticate(&token).inspect_err(|err| {
        if matches!(err, AppError::Unauthorized) {
            warn!("Rejected invalid or expired token");
        }
    })
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
}
