//! Create favorite and shopping_cart tables.
//!
//! Both lists share one shape: a (user, recipe) membership row.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn membership_table<T>(table: T, prefix: &str) -> TableCreateStatement
where
    T: Iden + Copy + 'static,
{
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new(Membership::Id)
                .string_len(32)
                .not_null()
                .primary_key(),
        )
        .col(ColumnDef::new(Membership::UserId).string_len(32).not_null())
        .col(ColumnDef::new(Membership::RecipeId).string_len(32).not_null())
        .col(
            ColumnDef::new(Membership::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{prefix}_user"))
                .from(table, Membership::UserId)
                .to(User::Table, User::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{prefix}_recipe"))
                .from(table, Membership::RecipeId)
                .to(Recipe::Table, Recipe::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

fn membership_unique_index<T>(table: T, prefix: &str) -> IndexCreateStatement
where
    T: Iden + 'static,
{
    Index::create()
        .name(format!("idx_{prefix}_user_recipe"))
        .table(table)
        .col(Membership::UserId)
        .col(Membership::RecipeId)
        .unique()
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(membership_table(Favorite::Table, "favorite"))
            .await?;
        manager
            .create_index(membership_unique_index(Favorite::Table, "favorite"))
            .await?;

        manager
            .create_table(membership_table(ShoppingCart::Table, "shopping_cart"))
            .await?;
        manager
            .create_index(membership_unique_index(ShoppingCart::Table, "shopping_cart"))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ShoppingCart::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Favorite::Table).to_owned())
            .await
    }
}

#[derive(Iden, Clone, Copy)]
enum Favorite {
    Table,
}

#[derive(Iden, Clone, Copy)]
enum ShoppingCart {
    Table,
}

#[derive(Iden)]
enum Membership {
    Id,
    UserId,
    RecipeId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Recipe {
    Table,
    Id,
}
