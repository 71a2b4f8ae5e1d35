use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar, WithRejection,
};
use serde_json::json;
use tracing::info;

use crate::error::AppError;
use crate::middleware::{TokenAuth, TOKEN_COOKIE};
use crate::models::{CredentialView, IssuedToken, LoginRequest, RegisterRequest};
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<CredentialView>), AppError> {
    let credential = state.auth.register(&req.username, &req.password)?;
    Ok((StatusCode::CREATED, Json(credential.public())))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, Json<IssuedToken>), AppError> {
    let issued = state.auth.login(&req.username, &req.password)?;

    let cookie = Cookie::build((TOKEN_COOKIE, issued.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(state.auth.ttl());

    Ok((jar.add(cookie), Json(issued)))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, impl IntoResponse) {
    info!("User logged out");

    let cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(0));

    (jar.remove(cookie), Json(json!({ "success": true })))
}

pub async fn me(TokenAuth(claims): TokenAuth) -> Json<serde_json::Value> {
    Json(json!({ "username": claims.sub, "expires_at": claims.exp }))
}
