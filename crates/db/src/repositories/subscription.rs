//! Subscription repository.

use std::collections::HashSet;
use std::sync::Arc;

use crate::entities::{Subscription, subscription};
use crate::repositories::map_insert_error;
use foodgram_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Subscription repository for database operations.
#[derive(Clone)]
pub struct SubscriptionRepository {
    db: Arc<DatabaseConnection>,
}

impl SubscriptionRepository {
    /// Create a new subscription repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a subscription by subscriber and author.
    pub async fn find_by_pair(
        &self,
        subscriber_id: &str,
        author_id: &str,
    ) -> AppResult<Option<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::SubscriberId.eq(subscriber_id))
            .filter(subscription::Column::AuthorId.eq(author_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user is subscribed to an author.
    pub async fn is_subscribed(&self, subscriber_id: &str, author_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(subscriber_id, author_id).await?.is_some())
    }

    /// Which of `author_ids` the subscriber follows.
    pub async fn subscribed_author_ids(
        &self,
        subscriber_id: &str,
        author_ids: &[String],
    ) -> AppResult<HashSet<String>> {
        if author_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = Subscription::find()
            .filter(subscription::Column::SubscriberId.eq(subscriber_id))
            .filter(subscription::Column::AuthorId.is_in(author_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|s| s.author_id).collect())
    }

    /// Create a new subscription.
    ///
    /// A concurrent duplicate surfaces as [`AppError::Conflict`].
    pub async fn create(&self, model: subscription::ActiveModel) -> AppResult<subscription::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_insert_error(&e, || "already subscribed".to_string()))
    }

    /// Delete a subscription by pair. Returns whether a row was removed.
    pub async fn delete_by_pair(&self, subscriber_id: &str, author_id: &str) -> AppResult<bool> {
        let result = Subscription::delete_many()
            .filter(subscription::Column::SubscriberId.eq(subscriber_id))
            .filter(subscription::Column::AuthorId.eq(author_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Subscriptions of a user, newest first (paginated).
    pub async fn find_by_subscriber(
        &self,
        subscriber_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<subscription::Model>> {
        Subscription::find()
            .filter(subscription::Column::SubscriberId.eq(subscriber_id))
            .order_by_desc(subscription::Column::CreatedAt)
            .order_by_desc(subscription::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count subscriptions of a user.
    pub async fn count_by_subscriber(&self, subscriber_id: &str) -> AppResult<u64> {
        Subscription::find()
            .filter(subscription::Column::SubscriberId.eq(subscriber_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_subscription(id: &str, subscriber_id: &str, author_id: &str) -> subscription::Model {
        subscription::Model {
            id: id.to_string(),
            subscriber_id: subscriber_id.to_string(),
            author_id: author_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_is_subscribed_true() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_subscription("s1", "user1", "user2")]])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        assert!(repo.is_subscribed("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_subscribed_false() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<subscription::Model>::new()])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        assert!(!repo.is_subscribed("user1", "user3").await.unwrap());
    }

    #[tokio::test]
    async fn test_subscribed_author_ids() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_subscription("s1", "user1", "user2"),
                    create_test_subscription("s2", "user1", "user4"),
                ]])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        let ids = repo
            .subscribed_author_ids(
                "user1",
                &["user2".to_string(), "user3".to_string(), "user4".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert!(ids.contains("user2"));
        assert!(!ids.contains("user3"));
    }

    #[tokio::test]
    async fn test_delete_by_pair_reports_missing_row() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        assert!(!repo.delete_by_pair("user1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_subscriber() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_subscription("s2", "user1", "user3"),
                    create_test_subscription("s1", "user1", "user2"),
                ]])
                .into_connection(),
        );

        let repo = SubscriptionRepository::new(db);
        let result = repo.find_by_subscriber("user1", 10, 0).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].author_id, "user3");
    }
}
