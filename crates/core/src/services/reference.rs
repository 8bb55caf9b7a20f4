//! Read-only access to tags and ingredients.

use foodgram_common::AppResult;
use foodgram_db::{
    entities::{ingredient, tag},
    repositories::{IngredientRepository, TagRepository},
};

/// Reference data service.
#[derive(Clone)]
pub struct ReferenceService {
    tag_repo: TagRepository,
    ingredient_repo: IngredientRepository,
}

impl ReferenceService {
    /// Create a new reference data service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository, ingredient_repo: IngredientRepository) -> Self {
        Self {
            tag_repo,
            ingredient_repo,
        }
    }

    /// All tags ordered by name.
    pub async fn tags(&self) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.find_all().await
    }

    /// One tag.
    pub async fn tag(&self, id: &str) -> AppResult<tag::Model> {
        self.tag_repo.get_by_id(id).await
    }

    /// Ingredients ordered by name; with `name`, only those containing it
    /// (case-insensitive), prefix matches first.
    pub async fn ingredients(&self, name: Option<&str>) -> AppResult<Vec<ingredient::Model>> {
        self.ingredient_repo.search(name).await
    }

    /// One ingredient.
    pub async fn ingredient(&self, id: &str) -> AppResult<ingredient::Model> {
        self.ingredient_repo.get_by_id(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use foodgram_common::AppError;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn create_test_service(db: MockDatabase) -> ReferenceService {
        let db: Arc<DatabaseConnection> = Arc::new(db.into_connection());
        ReferenceService::new(TagRepository::new(Arc::clone(&db)), IngredientRepository::new(db))
    }

    fn ingredient(id: &str, name: &str) -> ingredient::Model {
        ingredient::Model {
            id: id.to_string(),
            name: name.to_string(),
            measurement_unit: "g".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_tag_is_not_found() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<tag::Model>::new()]),
        );

        let err = service.tag("t404").await.unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ingredient_search_puts_prefix_matches_first() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                ingredient("i1", "brown sugar"),
                ingredient("i2", "sugar"),
                ingredient("i3", "Sugar syrup"),
            ]]),
        );

        let found = service.ingredients(Some("Sug")).await.unwrap();
        let names: Vec<&str> = found.iter().map(|i| i.name.as_str()).collect();

        assert_eq!(names, vec!["sugar", "Sugar syrup", "brown sugar"]);
    }
}
