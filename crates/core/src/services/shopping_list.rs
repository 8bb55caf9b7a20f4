//! Shopping list: ingredients of every recipe in the cart, summed up.

use std::collections::HashMap;

use foodgram_common::AppResult;
use foodgram_db::{
    entities::{ingredient, user},
    repositories::{RecipeList, RecipeListRepository, RecipeRepository},
};
use serde::Serialize;
use tracing::debug;

use crate::pdf;

/// Title printed at the top of the exported document.
pub const SHOPPING_LIST_TITLE: &str = "Shopping list";

/// Total amount of one ingredient across the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingItem {
    /// Ingredient name as stored.
    pub name: String,
    /// Unit the amount is expressed in.
    pub measurement_unit: String,
    /// Sum over all recipes in the cart.
    pub amount: i64,
}

/// Sum amounts per (name, unit), ordered by case-insensitive name, then unit.
pub fn aggregate<I>(rows: I) -> Vec<ShoppingItem>
where
    I: IntoIterator<Item = (ingredient::Model, i32)>,
{
    let mut totals: HashMap<(String, String), i64> = HashMap::new();
    for (ingredient, amount) in rows {
        *totals
            .entry((ingredient.name, ingredient.measurement_unit))
            .or_default() += i64::from(amount);
    }

    let mut items: Vec<ShoppingItem> = totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingItem {
            name,
            measurement_unit,
            amount,
        })
        .collect();
    items.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
            .then_with(|| a.name.cmp(&b.name))
    });
    items
}

/// `<index>. <Name> (<unit>) - <amount>`, numbered from 1.
#[must_use]
pub fn format_lines(items: &[ShoppingItem]) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. {} ({}) - {}",
                i + 1,
                capitalize(&item.name),
                item.measurement_unit,
                item.amount
            )
        })
        .collect()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// Builds a user's shopping list from their cart.
#[derive(Clone)]
pub struct ShoppingListService {
    list_repo: RecipeListRepository,
    recipe_repo: RecipeRepository,
}

impl ShoppingListService {
    /// Create a new shopping list service.
    #[must_use]
    pub const fn new(list_repo: RecipeListRepository, recipe_repo: RecipeRepository) -> Self {
        Self {
            list_repo,
            recipe_repo,
        }
    }

    /// Aggregated ingredients of every recipe in the user's cart.
    pub async fn collect(&self, user: &user::Model) -> AppResult<Vec<ShoppingItem>> {
        let recipe_ids = self
            .list_repo
            .recipe_ids(RecipeList::ShoppingCart, &user.id)
            .await?;
        let rows = self.recipe_repo.ingredients_for(&recipe_ids).await?;

        let items = aggregate(rows.into_iter().map(|(line, ingredient)| (ingredient, line.amount)));
        debug!(user_id = %user.id, recipes = recipe_ids.len(), items = items.len(), "Shopping list collected");
        Ok(items)
    }

    /// Shopping list rendered as a PDF document.
    pub async fn export_pdf(&self, user: &user::Model) -> AppResult<Vec<u8>> {
        let items = self.collect(user).await?;
        pdf::render_lines(SHOPPING_LIST_TITLE, &format_lines(&items))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use foodgram_db::entities::{recipe_ingredient, shopping_cart};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn ingredient(id: &str, name: &str, unit: &str) -> ingredient::Model {
        ingredient::Model {
            id: id.to_string(),
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    fn line(recipe_id: &str, ingredient_id: &str, amount: i32) -> recipe_ingredient::Model {
        recipe_ingredient::Model {
            id: format!("{recipe_id}-{ingredient_id}"),
            recipe_id: recipe_id.to_string(),
            ingredient_id: ingredient_id.to_string(),
            amount,
        }
    }

    fn create_test_user() -> user::Model {
        user::Model {
            id: "user1".to_string(),
            email: "user1@example.com".to_string(),
            username: "user1".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password: "hash".to_string(),
            token: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_aggregate_sums_across_recipes() {
        let items = aggregate([
            (ingredient("i1", "sugar", "g"), 100),
            (ingredient("i2", "Eggs", "pcs"), 2),
            (ingredient("i1", "sugar", "g"), 50),
            (ingredient("i3", "sugar", "tbsp"), 1),
        ]);

        assert_eq!(
            items,
            vec![
                ShoppingItem {
                    name: "Eggs".to_string(),
                    measurement_unit: "pcs".to_string(),
                    amount: 2,
                },
                ShoppingItem {
                    name: "sugar".to_string(),
                    measurement_unit: "g".to_string(),
                    amount: 150,
                },
                ShoppingItem {
                    name: "sugar".to_string(),
                    measurement_unit: "tbsp".to_string(),
                    amount: 1,
                },
            ]
        );
    }

    #[test]
    fn test_aggregate_does_not_overflow() {
        let items = aggregate([
            (ingredient("i1", "water", "ml"), i32::MAX),
            (ingredient("i1", "water", "ml"), i32::MAX),
        ]);
        assert_eq!(items[0].amount, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn test_format_lines() {
        let lines = format_lines(&aggregate([
            (ingredient("i1", "wHEAT flour", "g"), 500),
            (ingredient("i2", "butter", "g"), 30),
        ]));

        assert_eq!(
            lines,
            vec!["1. Butter (g) - 30".to_string(), "2. Wheat flour (g) - 500".to_string()]
        );
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("éclair"), "Éclair");
    }

    #[tokio::test]
    async fn test_collect_from_cart() {
        let db: Arc<DatabaseConnection> = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    shopping_cart::Model {
                        id: "c1".to_string(),
                        user_id: "user1".to_string(),
                        recipe_id: "r1".to_string(),
                        created_at: Utc::now().into(),
                    },
                    shopping_cart::Model {
                        id: "c2".to_string(),
                        user_id: "user1".to_string(),
                        recipe_id: "r2".to_string(),
                        created_at: Utc::now().into(),
                    },
                ]])
                .append_query_results([[
                    (line("r1", "i1", 200), ingredient("i1", "milk", "ml")),
                    (line("r2", "i1", 300), ingredient("i1", "milk", "ml")),
                ]])
                .into_connection(),
        );
        let service = ShoppingListService::new(
            RecipeListRepository::new(Arc::clone(&db)),
            RecipeRepository::new(db),
        );

        let items = service.collect(&create_test_user()).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, 500);
    }

    #[tokio::test]
    async fn test_export_empty_cart() {
        let db: Arc<DatabaseConnection> = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<shopping_cart::Model>::new()])
                .into_connection(),
        );
        let service = ShoppingListService::new(
            RecipeListRepository::new(Arc::clone(&db)),
            RecipeRepository::new(db),
        );

        let bytes = service.export_pdf(&create_test_user()).await.unwrap();

        assert!(bytes.starts_with(b"%PDF"));
    }
}
