//! Ingredient endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use foodgram_common::AppResult;
use foodgram_db::entities::ingredient;
use serde::Deserialize;

use crate::middleware::AppState;

/// `?name=` search.
#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    name: Option<String>,
}

/// Ingredients, optionally filtered by name; not paginated.
async fn list(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<ingredient::Model>>> {
    Ok(Json(
        state
            .reference_service
            .ingredients(params.name.as_deref())
            .await?,
    ))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ingredient::Model>> {
    Ok(Json(state.reference_service.ingredient(&id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(show))
}
