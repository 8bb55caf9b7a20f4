//! API endpoints.

mod auth;
mod ingredients;
mod recipes;
mod tags;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/auth", auth::router())
        .nest("/tags", tags::router())
        .nest("/ingredients", ingredients::router())
        .nest("/recipes", recipes::router())
}
