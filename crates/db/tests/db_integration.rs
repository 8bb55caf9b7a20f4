//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `foodgram_test`)
//!   `TEST_DB_PASSWORD` (default: `foodgram_test`)
//!   `TEST_DB_NAME` (default: `foodgram_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::Utc;
use foodgram_common::AppError;
use foodgram_db::entities::{ingredient, recipe, tag, user};
use foodgram_db::repositories::{
    IngredientLine, IngredientRepository, RecipeFilter, RecipeList, RecipeListRepository,
    RecipeRepository, SubscriptionRepository, TagRepository, UserRepository,
};
use foodgram_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::{Set, SqlxPostgresConnector};

fn new_user(id: &str) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(id.to_string()),
        email: Set(format!("{id}@example.com")),
        username: Set(id.to_string()),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        password: Set("hash".to_string()),
        token: Set(None),
        created_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_cleanup() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    let result = db.cleanup().await;
    assert!(result.is_ok(), "Cleanup failed: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_recipe_lifecycle() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let conn = Arc::new(SqlxPostgresConnector::from_sqlx_postgres_pool(
        db.conn.get_postgres_connection_pool().clone(),
    ));

    let users = UserRepository::new(Arc::clone(&conn));
    let tags = TagRepository::new(Arc::clone(&conn));
    let ingredients = IngredientRepository::new(Arc::clone(&conn));
    let recipes = RecipeRepository::new(Arc::clone(&conn));
    let lists = RecipeListRepository::new(Arc::clone(&conn));

    users.create(new_user("author")).await.unwrap();
    users.create(new_user("reader")).await.unwrap();

    tags.create(tag::ActiveModel {
        id: Set("t1".to_string()),
        name: Set("Breakfast".to_string()),
        color: Set(Some("#E26C2D".to_string())),
        slug: Set("breakfast".to_string()),
    })
    .await
    .unwrap();

    ingredients
        .create(ingredient::ActiveModel {
            id: Set("i1".to_string()),
            name: Set("flour".to_string()),
            measurement_unit: Set("g".to_string()),
        })
        .await
        .unwrap();

    let recipe = recipes
        .create_with_relations(
            recipe::ActiveModel {
                id: Set("r1".to_string()),
                author_id: Set("author".to_string()),
                name: Set("Pancakes".to_string()),
                text: Set("Mix and fry.".to_string()),
                cooking_time: Set(15),
                image: Set("recipes/r1.png".to_string()),
                created_at: Set(Utc::now().into()),
            },
            &["t1".to_string()],
            vec![IngredientLine {
                id: "ri1".to_string(),
                ingredient_id: "i1".to_string(),
                amount: 200,
            }],
        )
        .await
        .unwrap();

    let filter = RecipeFilter {
        tag_slugs: vec!["breakfast".to_string()],
        ..Default::default()
    };
    assert_eq!(recipes.count_filtered(&filter).await.unwrap(), 1);

    lists
        .add(RecipeList::ShoppingCart, "c1".to_string(), "reader", &recipe.id, "dup".to_string())
        .await
        .unwrap();
    let duplicate = lists
        .add(RecipeList::ShoppingCart, "c2".to_string(), "reader", &recipe.id, "dup".to_string())
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(msg)) if msg == "dup"));

    let lines = recipes.ingredients_for(&[recipe.id.clone()]).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].0.amount, 200);

    assert!(recipes.delete(&recipe.id).await.unwrap());
    assert!(
        lists
            .recipe_ids(RecipeList::ShoppingCart, "reader")
            .await
            .unwrap()
            .is_empty()
    );

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_self_subscription_rejected_by_constraint() {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let conn = Arc::new(SqlxPostgresConnector::from_sqlx_postgres_pool(
        db.conn.get_postgres_connection_pool().clone(),
    ));

    let users = UserRepository::new(Arc::clone(&conn));
    let subscriptions = SubscriptionRepository::new(Arc::clone(&conn));
    users.create(new_user("solo")).await.unwrap();

    let result = subscriptions
        .create(foodgram_db::entities::subscription::ActiveModel {
            id: Set("s1".to_string()),
            subscriber_id: Set("solo".to_string()),
            author_id: Set("solo".to_string()),
            created_at: Set(Utc::now().into()),
        })
        .await;
    assert!(result.is_err());

    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_postgres_url_format() {
    let config = TestDbConfig::default();
    let url = config.postgres_url();
    assert!(url.ends_with("/postgres"));
}
