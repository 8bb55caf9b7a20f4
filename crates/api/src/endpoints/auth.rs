//! Token endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use foodgram_common::AppResult;
use foodgram_core::LoginInput;
use serde::Serialize;

use crate::{
    extractors::{AuthUser, JsonBody},
    middleware::AppState,
    response::{created, no_content},
};

/// Login response.
#[derive(Serialize)]
struct TokenResponse {
    auth_token: String,
}

/// Exchange email and password for a token.
async fn login(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<LoginInput>,
) -> AppResult<(StatusCode, Json<TokenResponse>)> {
    let auth_token = state.user_service.login(input).await?;
    Ok(created(TokenResponse { auth_token }))
}

/// Revoke the caller's token.
async fn logout(AuthUser(user): AuthUser, State(state): State<AppState>) -> AppResult<StatusCode> {
    state.user_service.logout(&user).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token/login", post(login))
        .route("/token/logout", post(logout))
}
