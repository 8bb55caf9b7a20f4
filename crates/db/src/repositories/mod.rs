//! Repositories: one data-access object per aggregate.

pub mod ingredient;
pub mod recipe;
pub mod recipe_list;
pub mod subscription;
pub mod tag;
pub mod user;

pub use ingredient::IngredientRepository;
pub use recipe::{IngredientLine, RecipeFilter, RecipeRepository};
pub use recipe_list::{RecipeList, RecipeListRepository};
pub use subscription::SubscriptionRepository;
pub use tag::TagRepository;
pub use user::UserRepository;

use foodgram_common::AppError;
use sea_orm::{DbErr, SqlErr};

/// Map an insert failure, turning unique-constraint violations into
/// [`AppError::Conflict`] with the given message.
pub(crate) fn map_insert_error(err: &DbErr, conflict: impl FnOnce() -> String) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(conflict()),
        _ => AppError::Database(err.to_string()),
    }
}
