//! Create subscription table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subscription::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscription::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subscription::SubscriberId).string_len(32).not_null())
                    .col(ColumnDef::new(Subscription::AuthorId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Subscription::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_subscriber")
                            .from(Subscription::Table, Subscription::SubscriberId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_author")
                            .from(Subscription::Table, Subscription::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // A user never subscribes to themselves.
                    .check(
                        Expr::col(Subscription::SubscriberId)
                            .ne(Expr::col(Subscription::AuthorId)),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (subscriber_id, author_id) - prevent duplicate subscriptions
        manager
            .create_index(
                Index::create()
                    .name("idx_subscription_subscriber_author")
                    .table(Subscription::Table)
                    .col(Subscription::SubscriberId)
                    .col(Subscription::AuthorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: author_id (for is_subscribed lookups)
        manager
            .create_index(
                Index::create()
                    .name("idx_subscription_author_id")
                    .table(Subscription::Table)
                    .col(Subscription::AuthorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subscription::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Subscription {
    Table,
    Id,
    SubscriberId,
    AuthorId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
