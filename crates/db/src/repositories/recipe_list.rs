//! Favorites and shopping cart.
//!
//! Both lists are (user, recipe) membership tables with identical rules, so
//! one repository serves both, selected by [`RecipeList`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::entities::{Favorite, ShoppingCart, favorite, shopping_cart};
use crate::repositories::map_insert_error;
use chrono::Utc;
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    prelude::DateTimeWithTimeZone,
};

/// A per-user recipe collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeList {
    /// Recipes the user bookmarked.
    Favorites,
    /// Recipes whose ingredients go into the downloadable shopping list.
    ShoppingCart,
}

impl RecipeList {
    /// Human-readable list name used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::ShoppingCart => "shopping list",
        }
    }
}

impl fmt::Display for RecipeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Recipe list repository for database operations.
#[derive(Clone)]
pub struct RecipeListRepository {
    db: Arc<DatabaseConnection>,
}

impl RecipeListRepository {
    /// Create a new recipe list repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Check whether a recipe is in the user's list.
    pub async fn contains(&self, list: RecipeList, user_id: &str, recipe_id: &str) -> AppResult<bool> {
        let found = match list {
            RecipeList::Favorites => Favorite::find()
                .filter(favorite::Column::UserId.eq(user_id))
                .filter(favorite::Column::RecipeId.eq(recipe_id))
                .one(self.db.as_ref())
                .await
                .map(|m| m.is_some()),
            RecipeList::ShoppingCart => ShoppingCart::find()
                .filter(shopping_cart::Column::UserId.eq(user_id))
                .filter(shopping_cart::Column::RecipeId.eq(recipe_id))
                .one(self.db.as_ref())
                .await
                .map(|m| m.is_some()),
        };
        found.map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a membership row.
    ///
    /// A duplicate (including one racing this call) yields [`AppError::Conflict`]
    /// carrying `conflict_message`.
    pub async fn add(
        &self,
        list: RecipeList,
        id: String,
        user_id: &str,
        recipe_id: &str,
        conflict_message: String,
    ) -> AppResult<()> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = match list {
            RecipeList::Favorites => favorite::ActiveModel {
                id: Set(id),
                user_id: Set(user_id.to_string()),
                recipe_id: Set(recipe_id.to_string()),
                created_at: Set(now),
            }
            .insert(self.db.as_ref())
            .await
            .map(|_| ()),
            RecipeList::ShoppingCart => shopping_cart::ActiveModel {
                id: Set(id),
                user_id: Set(user_id.to_string()),
                recipe_id: Set(recipe_id.to_string()),
                created_at: Set(now),
            }
            .insert(self.db.as_ref())
            .await
            .map(|_| ()),
        };
        result.map_err(|e| map_insert_error(&e, || conflict_message))
    }

    /// Delete a membership row. Returns whether a row was removed.
    pub async fn remove(&self, list: RecipeList, user_id: &str, recipe_id: &str) -> AppResult<bool> {
        let result = match list {
            RecipeList::Favorites => Favorite::delete_many()
                .filter(favorite::Column::UserId.eq(user_id))
                .filter(favorite::Column::RecipeId.eq(recipe_id))
                .exec(self.db.as_ref())
                .await,
            RecipeList::ShoppingCart => ShoppingCart::delete_many()
                .filter(shopping_cart::Column::UserId.eq(user_id))
                .filter(shopping_cart::Column::RecipeId.eq(recipe_id))
                .exec(self.db.as_ref())
                .await,
        };
        let result = result.map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Which of `recipe_ids` are in the user's list.
    pub async fn member_ids(
        &self,
        list: RecipeList,
        user_id: &str,
        recipe_ids: &[String],
    ) -> AppResult<HashSet<String>> {
        if recipe_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Result<HashSet<String>, _> = match list {
            RecipeList::Favorites => Favorite::find()
                .filter(favorite::Column::UserId.eq(user_id))
                .filter(favorite::Column::RecipeId.is_in(recipe_ids.to_vec()))
                .all(self.db.as_ref())
                .await
                .map(|rows| rows.into_iter().map(|r| r.recipe_id).collect()),
            RecipeList::ShoppingCart => ShoppingCart::find()
                .filter(shopping_cart::Column::UserId.eq(user_id))
                .filter(shopping_cart::Column::RecipeId.is_in(recipe_ids.to_vec()))
                .all(self.db.as_ref())
                .await
                .map(|rows| rows.into_iter().map(|r| r.recipe_id).collect()),
        };
        ids.map_err(|e| AppError::Database(e.to_string()))
    }

    /// All recipe ids in the user's list, oldest first.
    pub async fn recipe_ids(&self, list: RecipeList, user_id: &str) -> AppResult<Vec<String>> {
        let ids: Result<Vec<String>, _> = match list {
            RecipeList::Favorites => Favorite::find()
                .filter(favorite::Column::UserId.eq(user_id))
                .order_by_asc(favorite::Column::CreatedAt)
                .all(self.db.as_ref())
                .await
                .map(|rows| rows.into_iter().map(|r| r.recipe_id).collect()),
            RecipeList::ShoppingCart => ShoppingCart::find()
                .filter(shopping_cart::Column::UserId.eq(user_id))
                .order_by_asc(shopping_cart::Column::CreatedAt)
                .all(self.db.as_ref())
                .await
                .map(|rows| rows.into_iter().map(|r| r.recipe_id).collect()),
        };
        ids.map_err(|e| AppError::Database(e.to_string()))
    }
}
