//! Tag endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use foodgram_common::AppResult;
use foodgram_db::entities::tag;

use crate::middleware::AppState;

/// All tags; not paginated.
async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<tag::Model>>> {
    Ok(Json(state.reference_service.tags().await?))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<tag::Model>> {
    Ok(Json(state.reference_service.tag(&id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(show))
}
