//! Recipe endpoints, including favorites, the shopping cart and the
//! shopping list download.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use foodgram_common::AppResult;
use foodgram_core::{RecipeInput, RecipeShort, RecipeView, UpdateMode};
use foodgram_db::{entities::user, repositories::RecipeList};
use tracing::debug;

use crate::{
    extractors::{AuthUser, JsonBody, MaybeAuthUser},
    middleware::AppState,
    pagination::Paginated,
    query::recipe_query,
    response::{Attachment, created, no_content},
};

const SHOPPING_LIST_FILENAME: &str = "shopping_list.pdf";

/// List recipes.
async fn list(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<Paginated<RecipeView>>> {
    let (query, params) = recipe_query(&pairs)?;
    let request = params.resolve(&state.pagination)?;

    let page = state
        .recipe_service
        .list(viewer.as_ref(), &query, request.limit, request.offset())
        .await?;
    Ok(Json(Paginated::new(page, request)?))
}

/// Create a recipe.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RecipeInput>,
) -> AppResult<(StatusCode, Json<RecipeView>)> {
    let view = state.recipe_service.create(&user, input).await?;
    Ok(created(view))
}

/// Get a recipe.
async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<RecipeView>> {
    Ok(Json(state.recipe_service.get(viewer.as_ref(), &id).await?))
}

/// Replace a recipe; `image` may be omitted.
async fn replace(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<RecipeInput>,
) -> AppResult<Json<RecipeView>> {
    let view = state
        .recipe_service
        .update(&user, &id, input, UpdateMode::Replace)
        .await?;
    Ok(Json(view))
}

/// Update some fields of a recipe.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<RecipeInput>,
) -> AppResult<Json<RecipeView>> {
    let view = state
        .recipe_service
        .update(&user, &id, input, UpdateMode::Partial)
        .await?;
    Ok(Json(view))
}

/// Delete a recipe.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.recipe_service.delete(&user, &id).await?;
    Ok(no_content())
}

async fn add_to(
    state: &AppState,
    list: RecipeList,
    user: &user::Model,
    recipe_id: &str,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    let short = state.recipe_list_service.add(list, user, recipe_id).await?;
    Ok(created(short))
}

/// Add to favorites.
async fn favorite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    add_to(&state, RecipeList::Favorites, &user, &id).await
}

/// Remove from favorites.
async fn unfavorite(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .recipe_list_service
        .remove(RecipeList::Favorites, &user, &id)
        .await?;
    Ok(no_content())
}

/// Add to the shopping cart.
async fn add_to_cart(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    add_to(&state, RecipeList::ShoppingCart, &user, &id).await
}

/// Remove from the shopping cart.
async fn remove_from_cart(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .recipe_list_service
        .remove(RecipeList::ShoppingCart, &user, &id)
        .await?;
    Ok(no_content())
}

/// Download the aggregated shopping list as a PDF.
async fn download_shopping_cart(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Attachment> {
    let bytes = state.shopping_list_service.export_pdf(&user).await?;
    debug!(user_id = %user.id, size = bytes.len(), "Shopping list rendered");
    Ok(Attachment::pdf(SHOPPING_LIST_FILENAME, bytes))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/download_shopping_cart", get(download_shopping_cart))
        .route(
            "/{id}",
            get(show).put(replace).patch(update).delete(delete),
        )
        .route("/{id}/favorite", post(favorite).delete(unfavorite))
        .route(
            "/{id}/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
}
