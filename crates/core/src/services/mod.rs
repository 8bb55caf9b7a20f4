//! Business logic services.

pub mod import;
pub mod recipe;
pub mod recipe_list;
pub mod reference;
pub mod shopping_list;
pub mod subscription;
pub mod user;

pub use import::{ImportReport, ImportService};
pub use recipe::{IngredientAmountInput, RecipeInput, RecipeQuery, RecipeService, UpdateMode};
pub use recipe_list::RecipeListService;
pub use reference::ReferenceService;
pub use shopping_list::{SHOPPING_LIST_TITLE, ShoppingItem, ShoppingListService};
pub use subscription::SubscriptionService;
pub use user::{LoginInput, RegisterInput, SetPasswordInput, UserService};
