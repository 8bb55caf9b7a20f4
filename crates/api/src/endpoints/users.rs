//! Users and subscriptions endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use foodgram_common::AppResult;
use foodgram_core::{RegisterInput, SetPasswordInput, SubscriptionView, UserProfile};
use foodgram_db::entities::user;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, JsonBody, MaybeAuthUser},
    middleware::AppState,
    pagination::{PageParams, Paginated},
    query::parse_recipes_limit,
    response::{created, no_content},
};

/// Registration response: the profile without subscription state.
#[derive(Serialize)]
struct RegisteredUser {
    email: String,
    id: String,
    username: String,
    first_name: String,
    last_name: String,
}

impl From<user::Model> for RegisteredUser {
    fn from(user: user::Model) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// `?recipes_limit=` plus paging.
#[derive(Debug, Default, Deserialize)]
struct SubscriptionParams {
    recipes_limit: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

/// List users.
async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Paginated<UserProfile>>> {
    let request = params.resolve(&state.pagination)?;
    let page = state
        .user_service
        .list(viewer.as_ref(), request.limit, request.offset())
        .await?;
    Ok(Json(Paginated::new(page, request)?))
}

/// Register a new user.
async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> AppResult<(StatusCode, Json<RegisteredUser>)> {
    let user = state.user_service.register(input).await?;
    Ok(created(user.into()))
}

/// Get current user.
async fn me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.user_service.profile(Some(&user), &user).await?))
}

/// Get a user by ID.
async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserProfile>> {
    let user = state.user_service.get(&id).await?;
    Ok(Json(state.user_service.profile(viewer.as_ref(), &user).await?))
}

/// Change the caller's password.
async fn set_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SetPasswordInput>,
) -> AppResult<StatusCode> {
    state.user_service.set_password(&user, input).await?;
    Ok(no_content())
}

/// Authors the caller follows.
async fn subscriptions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SubscriptionParams>,
) -> AppResult<Json<Paginated<SubscriptionView>>> {
    let recipes_limit = parse_recipes_limit(params.recipes_limit.as_deref())?;
    let request = PageParams {
        page: params.page,
        limit: params.limit,
    }
    .resolve(&state.pagination)?;

    let page = state
        .subscription_service
        .list(&user, request.limit, request.offset(), recipes_limit)
        .await?;
    Ok(Json(Paginated::new(page, request)?))
}

/// Follow an author.
async fn subscribe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<SubscriptionParams>,
) -> AppResult<(StatusCode, Json<SubscriptionView>)> {
    let recipes_limit = parse_recipes_limit(params.recipes_limit.as_deref())?;
    let view = state
        .subscription_service
        .subscribe(&user, &id, recipes_limit)
        .await?;
    Ok(created(view))
}

/// Stop following an author.
async fn unsubscribe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.subscription_service.unsubscribe(&user, &id).await?;
    Ok(no_content())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(register))
        .route("/me", get(me))
        .route("/set_password", post(set_password))
        .route("/subscriptions", get(subscriptions))
        .route("/{id}", get(show))
        .route("/{id}/subscribe", post(subscribe).delete(unsubscribe))
}
