//! Subscription service: following authors and listing followed authors.

use std::sync::Arc;

use foodgram_common::{AppError, AppResult, IdGenerator, StorageBackend};
use foodgram_db::{
    entities::{subscription, user},
    repositories::{RecipeRepository, SubscriptionRepository, UserRepository},
};
use sea_orm::Set;
use tracing::info;

use crate::views::{Page, RecipeShort, SubscriptionView, UserProfile};

/// Subscription service for business logic.
#[derive(Clone)]
pub struct SubscriptionService {
    subscription_repo: SubscriptionRepository,
    user_repo: UserRepository,
    recipe_repo: RecipeRepository,
    storage: Arc<dyn StorageBackend>,
    id_gen: IdGenerator,
}

impl SubscriptionService {
    /// Create a new subscription service.
    #[must_use]
    pub fn new(
        subscription_repo: SubscriptionRepository,
        user_repo: UserRepository,
        recipe_repo: RecipeRepository,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            subscription_repo,
            user_repo,
            recipe_repo,
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    /// Follow an author.
    pub async fn subscribe(
        &self,
        subscriber: &user::Model,
        author_id: &str,
        recipes_limit: Option<u64>,
    ) -> AppResult<SubscriptionView> {
        let author = self.user_repo.get_by_id(author_id).await?;

        if author.id == subscriber.id {
            return Err(AppError::BadRequest("cannot subscribe to yourself".to_string()));
        }
        if self
            .subscription_repo
            .is_subscribed(&subscriber.id, &author.id)
            .await?
        {
            return Err(AppError::Conflict("already subscribed".to_string()));
        }

        let model = subscription::ActiveModel {
            id: Set(self.id_gen.generate()),
            subscriber_id: Set(subscriber.id.clone()),
            author_id: Set(author.id.clone()),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.subscription_repo.create(model).await?;
        info!(subscriber_id = %subscriber.id, author_id = %author.id, "Subscribed");

        self.view(&author, recipes_limit).await
    }

    /// Stop following an author.
    pub async fn unsubscribe(&self, subscriber: &user::Model, author_id: &str) -> AppResult<()> {
        let author = self.user_repo.get_by_id(author_id).await?;

        if !self
            .subscription_repo
            .delete_by_pair(&subscriber.id, &author.id)
            .await?
        {
            return Err(AppError::NotInList(
                "you are not subscribed to this user".to_string(),
            ));
        }
        info!(subscriber_id = %subscriber.id, author_id = %author.id, "Unsubscribed");

        Ok(())
    }

    /// Authors the subscriber follows, newest subscription first.
    pub async fn list(
        &self,
        subscriber: &user::Model,
        limit: u64,
        offset: u64,
        recipes_limit: Option<u64>,
    ) -> AppResult<Page<SubscriptionView>> {
        let rows = self
            .subscription_repo
            .find_by_subscriber(&subscriber.id, limit, offset)
            .await?;
        let count = self.subscription_repo.count_by_subscriber(&subscriber.id).await?;

        let author_ids: Vec<String> = rows.iter().map(|s| s.author_id.clone()).collect();
        let authors = self.user_repo.find_by_ids(&author_ids).await?;

        let mut items = Vec::with_capacity(rows.len());
        for author_id in &author_ids {
            if let Some(author) = authors.iter().find(|a| &a.id == author_id) {
                items.push(self.view(author, recipes_limit).await?);
            }
        }

        Ok(Page::new(items, count))
    }

    async fn view(
        &self,
        author: &user::Model,
        recipes_limit: Option<u64>,
    ) -> AppResult<SubscriptionView> {
        let recipes = self
            .recipe_repo
            .find_by_author(&author.id, recipes_limit)
            .await?;
        let recipes_count = self.recipe_repo.count_by_author(&author.id).await?;

        Ok(SubscriptionView {
            author: UserProfile::new(author, true),
            recipes: recipes
                .iter()
                .map(|r| RecipeShort::new(r, self.storage.as_ref()))
                .collect(),
            recipes_count,
        })
    }
}
