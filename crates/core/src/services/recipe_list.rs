//! Favorites and shopping cart membership.

use std::sync::Arc;

use foodgram_common::{AppError, AppResult, IdGenerator, StorageBackend};
use foodgram_db::{
    entities::user,
    repositories::{RecipeList, RecipeListRepository, RecipeRepository},
};
use tracing::info;

use crate::views::RecipeShort;

/// Adds recipes to and removes them from a user's favorites or cart.
#[derive(Clone)]
pub struct RecipeListService {
    list_repo: RecipeListRepository,
    recipe_repo: RecipeRepository,
    storage: Arc<dyn StorageBackend>,
    id_gen: IdGenerator,
}

impl RecipeListService {
    /// Create a new recipe list service.
    #[must_use]
    pub fn new(
        list_repo: RecipeListRepository,
        recipe_repo: RecipeRepository,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            list_repo,
            recipe_repo,
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a recipe to one of the user's lists.
    pub async fn add(
        &self,
        list: RecipeList,
        user: &user::Model,
        recipe_id: &str,
    ) -> AppResult<RecipeShort> {
        let recipe = self.recipe_repo.get_by_id(recipe_id).await?;
        let conflict = format!("recipe {} is already in your {list}", recipe.name);

        if self.list_repo.contains(list, &user.id, &recipe.id).await? {
            return Err(AppError::Conflict(conflict));
        }
        self.list_repo
            .add(list, self.id_gen.generate(), &user.id, &recipe.id, conflict)
            .await?;

        info!(user_id = %user.id, recipe_id = %recipe.id, %list, "Recipe added");
        Ok(RecipeShort::new(&recipe, self.storage.as_ref()))
    }

    /// Remove a recipe from one of the user's lists.
    pub async fn remove(&self, list: RecipeList, user: &user::Model, recipe_id: &str) -> AppResult<()> {
        let recipe = self.recipe_repo.get_by_id(recipe_id).await?;

        if !self.list_repo.remove(list, &user.id, &recipe.id).await? {
            return Err(AppError::NotInList(format!("recipe is not in your {list}")));
        }

        info!(user_id = %user.id, recipe_id = %recipe.id, %list, "Recipe removed");
        Ok(())
    }
}
