//! Recipe repository.
//!
//! A recipe is stored as one `recipe` row plus its `recipe_tag` and
//! `recipe_ingredient` rows; writes touching several of them run in a
//! single transaction.

use std::sync::Arc;

use crate::entities::{
    Ingredient, Recipe, RecipeIngredient, RecipeTag, Tag, favorite, ingredient, recipe,
    recipe_ingredient, recipe_tag, shopping_cart, tag,
};
use crate::repositories::map_insert_error;
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
    sea_query::{Expr, Query},
};

/// Listing filters; every `Some`/non-empty field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Only recipes written by this user.
    pub author_id: Option<String>,
    /// Only recipes carrying at least one of these tag slugs.
    pub tag_slugs: Vec<String>,
    /// Only recipes in this user's favorites.
    pub favorited_by: Option<String>,
    /// Only recipes in this user's shopping cart.
    pub in_cart_of: Option<String>,
}

/// One ingredient row to be written for a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientLine {
    /// Row id.
    pub id: String,
    /// Referenced ingredient.
    pub ingredient_id: String,
    /// Quantity, always > 0.
    pub amount: i32,
}

const DUPLICATE_NAME: &str = "a recipe with this name already exists";

/// Recipe repository for database operations.
#[derive(Clone)]
pub struct RecipeRepository {
    db: Arc<DatabaseConnection>,
}

impl RecipeRepository {
    /// Create a new recipe repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a recipe by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<recipe::Model>> {
        Recipe::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a recipe by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<recipe::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::RecipeNotFound(id.to_string()))
    }

    /// Find recipes by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<recipe::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Recipe::find()
            .filter(recipe::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a recipe by its (unique) name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<recipe::Model>> {
        Recipe::find()
            .filter(recipe::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a recipe together with its tags and ingredient amounts.
    pub async fn create_with_relations(
        &self,
        model: recipe::ActiveModel,
        tag_ids: &[String],
        ingredients: Vec<IngredientLine>,
    ) -> AppResult<recipe::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = model
            .insert(&txn)
            .await
            .map_err(|e| map_insert_error(&e, || DUPLICATE_NAME.to_string()))?;

        insert_tags(&txn, &created.id, tag_ids).await?;
        insert_ingredients(&txn, &created.id, ingredients).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(created)
    }

    /// Update a recipe row and, when given, replace its tags and ingredients.
    pub async fn update_with_relations(
        &self,
        model: recipe::ActiveModel,
        tag_ids: Option<&[String]>,
        ingredients: Option<Vec<IngredientLine>>,
    ) -> AppResult<recipe::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = model
            .update(&txn)
            .await
            .map_err(|e| map_insert_error(&e, || DUPLICATE_NAME.to_string()))?;

        if let Some(tag_ids) = tag_ids {
            RecipeTag::delete_many()
                .filter(recipe_tag::Column::RecipeId.eq(updated.id.as_str()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            insert_tags(&txn, &updated.id, tag_ids).await?;
        }

        if let Some(ingredients) = ingredients {
            RecipeIngredient::delete_many()
                .filter(recipe_ingredient::Column::RecipeId.eq(updated.id.as_str()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            insert_ingredients(&txn, &updated.id, ingredients).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated)
    }

    /// Delete a recipe; link rows cascade.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Recipe::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Recipes matching `filter`, newest first (paginated).
    pub async fn find_filtered(
        &self,
        filter: &RecipeFilter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<recipe::Model>> {
        apply_filter(Recipe::find(), filter)
            .order_by_desc(recipe::Column::CreatedAt)
            .order_by_desc(recipe::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count recipes matching `filter`.
    pub async fn count_filtered(&self, filter: &RecipeFilter) -> AppResult<u64> {
        apply_filter(Recipe::find(), filter)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// An author's recipes, newest first, optionally capped.
    pub async fn find_by_author(
        &self,
        author_id: &str,
        limit: Option<u64>,
    ) -> AppResult<Vec<recipe::Model>> {
        Recipe::find()
            .filter(recipe::Column::AuthorId.eq(author_id))
            .order_by_desc(recipe::Column::CreatedAt)
            .order_by_desc(recipe::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count an author's recipes.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        Recipe::find()
            .filter(recipe::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Tags of the given recipes as `(recipe_id, tag)` pairs, tags ordered by name.
    pub async fn tags_for(&self, recipe_ids: &[String]) -> AppResult<Vec<(String, tag::Model)>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = RecipeTag::find()
            .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .find_also_related(Tag)
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(link, tag)| tag.map(|t| (link.recipe_id, t)))
            .collect())
    }

    /// Ingredient rows of the given recipes joined with the ingredient they use.
    pub async fn ingredients_for(
        &self,
        recipe_ids: &[String],
    ) -> AppResult<Vec<(recipe_ingredient::Model, ingredient::Model)>> {
        if recipe_ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = RecipeIngredient::find()
            .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.to_vec()))
            .find_also_related(Ingredient)
            .order_by_asc(recipe_ingredient::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter_map(|(line, ingredient)| ingredient.map(|i| (line, i)))
            .collect())
    }
}

fn apply_filter(mut select: Select<Recipe>, filter: &RecipeFilter) -> Select<Recipe> {
    if let Some(author_id) = &filter.author_id {
        select = select.filter(recipe::Column::AuthorId.eq(author_id.as_str()));
    }

    if !filter.tag_slugs.is_empty() {
        select = select.filter(
            recipe::Column::Id.in_subquery(
                Query::select()
                    .column(recipe_tag::Column::RecipeId)
                    .from(RecipeTag)
                    .inner_join(
                        Tag,
                        Expr::col((Tag, tag::Column::Id))
                            .equals((RecipeTag, recipe_tag::Column::TagId)),
                    )
                    .and_where(tag::Column::Slug.is_in(filter.tag_slugs.clone()))
                    .to_owned(),
            ),
        );
    }

    if let Some(user_id) = &filter.favorited_by {
        select = select.filter(
            recipe::Column::Id.in_subquery(
                Query::select()
                    .column(favorite::Column::RecipeId)
                    .from(favorite::Entity)
                    .and_where(favorite::Column::UserId.eq(user_id.as_str()))
                    .to_owned(),
            ),
        );
    }

    if let Some(user_id) = &filter.in_cart_of {
        select = select.filter(
            recipe::Column::Id.in_subquery(
                Query::select()
                    .column(shopping_cart::Column::RecipeId)
                    .from(shopping_cart::Entity)
                    .and_where(shopping_cart::Column::UserId.eq(user_id.as_str()))
                    .to_owned(),
            ),
        );
    }

    select
}

async fn insert_tags(txn: &DatabaseTransaction, recipe_id: &str, tag_ids: &[String]) -> AppResult<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    let rows = tag_ids.iter().map(|tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id.to_string()),
        tag_id: Set(tag_id.clone()),
    });

    RecipeTag::insert_many(rows)
        .exec_without_returning(txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

async fn insert_ingredients(
    txn: &DatabaseTransaction,
    recipe_id: &str,
    ingredients: Vec<IngredientLine>,
) -> AppResult<()> {
    if ingredients.is_empty() {
        return Ok(());
    }

    let rows = ingredients.into_iter().map(|line| recipe_ingredient::ActiveModel {
        id: Set(line.id),
        recipe_id: Set(recipe_id.to_string()),
        ingredient_id: Set(line.ingredient_id),
        amount: Set(line.amount),
    });

    RecipeIngredient::insert_many(rows)
        .exec_without_returning(txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};

    fn create_test_recipe(id: &str, author_id: &str, name: &str) -> recipe::Model {
        recipe::Model {
            id: id.to_string(),
            author_id: author_id.to_string(),
            name: name.to_string(),
            text: "Mix and bake.".to_string(),
            cooking_time: 30,
            image: format!("recipes/{id}.png"),
            created_at: Utc::now().into(),
        }
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<recipe::Model>::new()])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let result = repo.get_by_id("r404").await;

        assert!(matches!(result, Err(AppError::RecipeNotFound(id)) if id == "r404"));
    }

    #[tokio::test]
    async fn test_create_with_relations_runs_in_transaction() {
        let recipe = create_test_recipe("r1", "user1", "Pancakes");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[recipe.clone()]])
                .append_exec_results([exec(2), exec(1)])
                .into_connection(),
        );

        let repo = RecipeRepository::new(Arc::clone(&db));
        let model = recipe::ActiveModel {
            id: Set("r1".to_string()),
            author_id: Set("user1".to_string()),
            name: Set("Pancakes".to_string()),
            text: Set("Mix and bake.".to_string()),
            cooking_time: Set(30),
            image: Set("recipes/r1.png".to_string()),
            created_at: Set(recipe.created_at),
        };
        let created = repo
            .create_with_relations(
                model,
                &["t1".to_string(), "t2".to_string()],
                vec![IngredientLine {
                    id: "ri1".to_string(),
                    ingredient_id: "i1".to_string(),
                    amount: 200,
                }],
            )
            .await
            .unwrap();

        assert_eq!(created, recipe);
    }

    #[tokio::test]
    async fn test_update_keeps_relations_when_absent() {
        let recipe = create_test_recipe("r1", "user1", "Waffles");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[recipe.clone()]])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let model = recipe::ActiveModel {
            id: Set("r1".to_string()),
            name: Set("Waffles".to_string()),
            ..Default::default()
        };
        let updated = repo.update_with_relations(model, None, None).await.unwrap();

        assert_eq!(updated.name, "Waffles");
    }

    #[tokio::test]
    async fn test_update_replaces_tags_and_ingredients() {
        let recipe = create_test_recipe("r1", "user1", "Waffles");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[recipe.clone()]])
                .append_exec_results([exec(2), exec(1), exec(3), exec(1)])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let model = recipe::ActiveModel {
            id: Set("r1".to_string()),
            ..Default::default()
        };
        let tags = ["t3".to_string()];
        let updated = repo
            .update_with_relations(
                model,
                Some(&tags),
                Some(vec![IngredientLine {
                    id: "ri9".to_string(),
                    ingredient_id: "i2".to_string(),
                    amount: 1,
                }]),
            )
            .await
            .unwrap();

        assert_eq!(updated.id, "r1");
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec(0)])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        assert!(!repo.delete("r1").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_filtered_and_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_recipe("r2", "user1", "Soup"),
                    create_test_recipe("r1", "user1", "Salad"),
                ]])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => Into::<Value>::into(2i64)
                }]])
                .into_connection(),
        );

        let repo = RecipeRepository::new(db);
        let filter = RecipeFilter {
            author_id: Some("user1".to_string()),
            tag_slugs: vec!["lunch".to_string()],
            favorited_by: Some("user2".to_string()),
            in_cart_of: None,
        };

        let page = repo.find_filtered(&filter, 6, 0).await.unwrap();
        let count = repo.count_filtered(&filter).await.unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_filter_builds_subqueries() {
        use sea_orm::QueryTrait;

        let filter = RecipeFilter {
            author_id: None,
            tag_slugs: vec!["breakfast".to_string()],
            favorited_by: None,
            in_cart_of: Some("user1".to_string()),
        };
        let sql = apply_filter(Recipe::find(), &filter)
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""recipe_tag""#));
        assert!(sql.contains(r#""slug" IN ('breakfast')"#));
        assert!(sql.contains(r#""shopping_cart""#));
        assert!(!sql.contains(r#""favorite""#));
    }
}
