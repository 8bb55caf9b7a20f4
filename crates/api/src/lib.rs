//! HTTP API layer for foodgram.
//!
//! - **Endpoints**: users, tokens, tags, ingredients, recipes, favorites,
//!   shopping cart, subscriptions
//! - **Extractors**: authentication, JSON bodies, pagination
//! - **Middleware**: token authentication
//!
//! Built on Axum 0.8; the binary adds tracing, CORS and static media.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod pagination;
pub mod query;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
