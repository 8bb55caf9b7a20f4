//! Ingredient repository.

use std::sync::Arc;

use crate::entities::{Ingredient, ingredient};
use crate::repositories::map_insert_error;
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::{Expr, Func},
};

/// Ingredient repository for database operations.
#[derive(Clone)]
pub struct IngredientRepository {
    db: Arc<DatabaseConnection>,
}

impl IngredientRepository {
    /// Create a new ingredient repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an ingredient by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<ingredient::Model>> {
        Ingredient::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an ingredient by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<ingredient::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ingredient {id}")))
    }

    /// Find ingredients by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<ingredient::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Ingredient::find()
            .filter(ingredient::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the ingredient with this exact name and unit.
    pub async fn find_by_name_and_unit(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> AppResult<Option<ingredient::Model>> {
        Ingredient::find()
            .filter(ingredient::Column::Name.eq(name))
            .filter(ingredient::Column::MeasurementUnit.eq(measurement_unit))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Ingredients ordered by name, optionally filtered by a case-insensitive
    /// substring of the name.
    ///
    /// Names starting with `query` come before names that merely contain it.
    pub async fn search(&self, query: Option<&str>) -> AppResult<Vec<ingredient::Model>> {
        let needle = query.map(str::trim).filter(|q| !q.is_empty()).map(str::to_lowercase);

        let mut select = Ingredient::find()
            .order_by_asc(ingredient::Column::Name)
            .order_by_asc(ingredient::Column::MeasurementUnit);

        if let Some(needle) = &needle {
            let pattern = format!("%{}%", escape_like(needle));
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(ingredient::Column::Name))).like(pattern),
            );
        }

        let mut found = select
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(needle) = &needle {
            // Stable sort keeps name order within each group.
            found.sort_by_key(|i| !i.name.to_lowercase().starts_with(needle.as_str()));
        }

        Ok(found)
    }

    /// Create a new ingredient.
    pub async fn create(&self, model: ingredient::ActiveModel) -> AppResult<ingredient::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_insert_error(&e, || "ingredient already exists".to_string()))
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_ingredient(id: &str, name: &str, unit: &str) -> ingredient::Model {
        ingredient::Model {
            id: id.to_string(),
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    #[tokio::test]
    async fn test_search_puts_prefix_matches_first() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_ingredient("i1", "Brown sugar", "g"),
                    create_test_ingredient("i2", "Sugar", "g"),
                    create_test_ingredient("i3", "Sugar syrup", "ml"),
                ]])
                .into_connection(),
        );

        let repo = IngredientRepository::new(db);
        let found = repo.search(Some("SUG")).await.unwrap();

        let ids: Vec<_> = found.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["i2", "i3", "i1"]);
    }

    #[tokio::test]
    async fn test_search_without_query_keeps_order() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_ingredient("i1", "Apple", "pcs"),
                    create_test_ingredient("i2", "Butter", "g"),
                ]])
                .into_connection(),
        );

        let repo = IngredientRepository::new(db);
        let found = repo.search(Some("  ")).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "i1");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<ingredient::Model>::new()])
                .into_connection(),
        );

        let repo = IngredientRepository::new(db);
        assert!(matches!(repo.get_by_id("nope").await, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
