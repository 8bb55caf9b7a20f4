//! Serializable shapes returned by the services.

#![allow(missing_docs)]

use foodgram_common::StorageBackend;
use foodgram_db::entities::{ingredient, recipe, tag, user};
use serde::Serialize;

/// A page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub count: u64,
}

impl<T> Page<T> {
    /// Create a page.
    #[must_use]
    pub const fn new(items: Vec<T>, count: u64) -> Self {
        Self { items, count }
    }
}

/// Public user profile as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the viewer follows this user; always false for anonymous viewers.
    pub is_subscribed: bool,
}

impl UserProfile {
    /// Build a profile with a precomputed subscription flag.
    #[must_use]
    pub fn new(user: &user::Model, is_subscribed: bool) -> Self {
        Self {
            email: user.email.clone(),
            id: user.id.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_subscribed,
        }
    }
}

/// Short recipe form used by favorites, cart and subscription listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeShort {
    pub id: String,
    pub name: String,
    /// Public image URL.
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeShort {
    /// Build the short form, resolving the image key to a URL.
    #[must_use]
    pub fn new(recipe: &recipe::Model, storage: &dyn StorageBackend) -> Self {
        Self {
            id: recipe.id.clone(),
            name: recipe.name.clone(),
            image: storage.public_url(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Ingredient with the amount a recipe uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredientView {
    pub id: String,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl RecipeIngredientView {
    /// Combine an ingredient with its amount.
    #[must_use]
    pub fn new(ingredient: &ingredient::Model, amount: i32) -> Self {
        Self {
            id: ingredient.id.clone(),
            name: ingredient.name.clone(),
            measurement_unit: ingredient.measurement_unit.clone(),
            amount,
        }
    }
}

/// Full recipe representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeView {
    pub id: String,
    pub tags: Vec<tag::Model>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// An author the caller follows, with a preview of their recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: u64,
}
