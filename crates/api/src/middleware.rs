//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use foodgram_common::{Config, PaginationConfig, StorageBackend};
use foodgram_core::{
    RecipeListService, RecipeService, ReferenceService, ShoppingListService, SubscriptionService,
    UserService,
};
use foodgram_db::repositories::{
    IngredientRepository, RecipeListRepository, RecipeRepository, SubscriptionRepository,
    TagRepository, UserRepository,
};
use sea_orm::DatabaseConnection;
use tracing::debug;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub recipe_service: RecipeService,
    pub recipe_list_service: RecipeListService,
    pub subscription_service: SubscriptionService,
    pub shopping_list_service: ShoppingListService,
    pub reference_service: ReferenceService,
    pub pagination: PaginationConfig,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn StorageBackend>,
        config: &Config,
    ) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let subscription_repo = SubscriptionRepository::new(Arc::clone(&db));
        let tag_repo = TagRepository::new(Arc::clone(&db));
        let ingredient_repo = IngredientRepository::new(Arc::clone(&db));
        let recipe_repo = RecipeRepository::new(Arc::clone(&db));
        let list_repo = RecipeListRepository::new(db);

        let user_service = UserService::with_default_policy(user_repo.clone(), subscription_repo.clone());
        let recipe_service = RecipeService::new(
            recipe_repo.clone(),
            tag_repo.clone(),
            ingredient_repo.clone(),
            user_repo.clone(),
            subscription_repo.clone(),
            list_repo.clone(),
            Arc::clone(&storage),
            config.media.max_upload_bytes,
        );
        let recipe_list_service =
            RecipeListService::new(list_repo.clone(), recipe_repo.clone(), Arc::clone(&storage));
        let subscription_service =
            SubscriptionService::new(subscription_repo, user_repo, recipe_repo.clone(), storage);
        let shopping_list_service = ShoppingListService::new(list_repo, recipe_repo);
        let reference_service = ReferenceService::new(tag_repo, ingredient_repo);

        Self {
            user_service,
            recipe_service,
            recipe_list_service,
            subscription_service,
            shopping_list_service,
            reference_service,
            pagination: config.pagination,
        }
    }
}

/// Extract the key from `Token <key>` or `Bearer <key>`.
fn parse_authorization(value: &str) -> Option<&str> {
    let (scheme, key) = value.trim().split_once(' ')?;
    let key = key.trim();
    let known = scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer");
    (known && !key.is_empty()).then_some(key)
}

/// Authentication middleware.
///
/// A request without credentials stays anonymous; a request carrying an
/// unknown token is rejected with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_authorization)
        .map(str::to_string);

    if let Some(token) = token {
        match state.user_service.authenticate_by_token(&token).await {
            Ok(user) => {
                debug!(user_id = %user.id, "Authenticated request");
                req.extensions_mut().insert(user);
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Token abc123"), Some("abc123"));
        assert_eq!(parse_authorization("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_authorization("token  abc123 "), Some("abc123"));
        assert_eq!(parse_authorization("Basic dXNlcjpwYXNz"), None);
        assert_eq!(parse_authorization("Token "), None);
        assert_eq!(parse_authorization("abc123"), None);
    }
}
