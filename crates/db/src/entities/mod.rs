//! Database entities.

#![allow(missing_docs)]

pub mod favorite;
pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod recipe_tag;
pub mod shopping_cart;
pub mod subscription;
pub mod tag;
pub mod user;

pub use favorite::Entity as Favorite;
pub use ingredient::Entity as Ingredient;
pub use recipe::Entity as Recipe;
pub use recipe_ingredient::Entity as RecipeIngredient;
pub use recipe_tag::Entity as RecipeTag;
pub use shopping_cart::Entity as ShoppingCart;
pub use subscription::Entity as Subscription;
pub use tag::Entity as Tag;
pub use user::Entity as User;
