//! Tag repository.

use std::sync::Arc;

use crate::entities::{Tag, tag};
use crate::repositories::map_insert_error;
use foodgram_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a tag by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<tag::Model>> {
        Tag::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a tag by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<tag::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("tag {id}")))
    }

    /// Find tags by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<tag::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Tag::find()
            .filter(tag::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a tag by slug.
    pub async fn find_by_slug(&self, slug: &str) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::Slug.eq(slug))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All tags ordered by name.
    pub async fn find_all(&self) -> AppResult<Vec<tag::Model>> {
        Tag::find()
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new tag.
    pub async fn create(&self, model: tag::ActiveModel) -> AppResult<tag::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_insert_error(&e, || "tag name or slug already exists".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_tag(id: &str, name: &str) -> tag::Model {
        tag::Model {
            id: id.to_string(),
            name: name.to_string(),
            color: Some("#E26C2D".to_string()),
            slug: name.to_lowercase(),
        }
    }

    #[tokio::test]
    async fn test_find_all() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_tag("t1", "Breakfast"),
                    create_test_tag("t2", "Dinner"),
                ]])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let tags = repo.find_all().await.unwrap();

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].slug, "breakfast");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<tag::Model>::new()])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let result = repo.get_by_id("t9").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_slug() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_tag("t1", "Lunch")]])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let tag = repo.find_by_slug("lunch").await.unwrap().unwrap();

        assert_eq!(tag.id, "t1");
    }
}
