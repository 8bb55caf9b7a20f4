//! Recipe service: validation, persistence and representation of recipes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use foodgram_common::{
    AppError, AppResult, IdGenerator, StorageBackend, decode_image_data_url, generate_storage_key,
};
use foodgram_db::{
    entities::{recipe, user},
    repositories::{
        IngredientLine, IngredientRepository, RecipeFilter, RecipeList, RecipeListRepository,
        RecipeRepository, SubscriptionRepository, TagRepository, UserRepository,
    },
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::{info, warn};

use crate::views::{Page, RecipeIngredientView, RecipeView, UserProfile};

const MAX_NAME_LENGTH: usize = 200;
const IMAGE_PREFIX: &str = "recipes";

/// One ingredient reference in a recipe payload.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountInput {
    /// Ingredient id.
    pub id: String,
    /// Quantity in the ingredient's unit.
    pub amount: i64,
}

/// Recipe payload.
///
/// Every field is optional at the type level; which ones are required
/// depends on the operation (see [`UpdateMode`]).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeInput {
    /// Tag ids.
    pub tags: Option<Vec<String>>,
    /// Ingredient ids with amounts.
    pub ingredients: Option<Vec<IngredientAmountInput>>,
    /// Recipe title.
    pub name: Option<String>,
    /// Description.
    pub text: Option<String>,
    /// Minutes.
    pub cooking_time: Option<i64>,
    /// `data:image/<type>;base64,<payload>` string.
    pub image: Option<String>,
}

/// How an update treats absent fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Every field except `image` must be present.
    Replace,
    /// Absent fields keep their current value.
    Partial,
}

/// Listing filters in request terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    /// Author id.
    pub author: Option<String>,
    /// Tag slugs; a recipe matches when it has any of them.
    pub tags: Vec<String>,
    /// Only the viewer's favorites. Ignored for anonymous viewers.
    pub is_favorited: bool,
    /// Only recipes in the viewer's cart. Ignored for anonymous viewers.
    pub is_in_shopping_cart: bool,
}

/// Validated, not yet persisted field values.
#[derive(Debug, Default)]
struct CheckedFields {
    tags: Option<Vec<String>>,
    ingredients: Option<Vec<(String, i32)>>,
    name: Option<String>,
    text: Option<String>,
    cooking_time: Option<i32>,
}

/// Recipe service for business logic.
#[derive(Clone)]
pub struct RecipeService {
    recipe_repo: RecipeRepository,
    tag_repo: TagRepository,
    ingredient_repo: IngredientRepository,
    user_repo: UserRepository,
    subscription_repo: SubscriptionRepository,
    list_repo: RecipeListRepository,
    storage: Arc<dyn StorageBackend>,
    max_upload_bytes: usize,
    id_gen: IdGenerator,
}

impl RecipeService {
    /// Create a new recipe service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recipe_repo: RecipeRepository,
        tag_repo: TagRepository,
        ingredient_repo: IngredientRepository,
        user_repo: UserRepository,
        subscription_repo: SubscriptionRepository,
        list_repo: RecipeListRepository,
        storage: Arc<dyn StorageBackend>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            recipe_repo,
            tag_repo,
            ingredient_repo,
            user_repo,
            subscription_repo,
            list_repo,
            storage,
            max_upload_bytes,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a recipe authored by `author`.
    pub async fn create(&self, author: &user::Model, input: RecipeInput) -> AppResult<RecipeView> {
        let fields = check_fields(&input, true)?;
        let image = input
            .image
            .as_deref()
            .ok_or_else(|| AppError::field("image", "This field is required."))?;
        self.check_references(&fields, None).await?;

        let image_key = self.store_image(image).await?;

        let (Some(tags), Some(ingredients), Some(name), Some(text), Some(cooking_time)) = (
            fields.tags,
            fields.ingredients,
            fields.name,
            fields.text,
            fields.cooking_time,
        ) else {
            return Err(AppError::Internal("checked recipe is incomplete".to_string()));
        };

        let model = recipe::ActiveModel {
            id: Set(self.id_gen.generate()),
            author_id: Set(author.id.clone()),
            name: Set(name),
            text: Set(text),
            cooking_time: Set(cooking_time),
            image: Set(image_key.clone()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let created = match self
            .recipe_repo
            .create_with_relations(model, &tags, self.ingredient_lines(&ingredients))
            .await
        {
            Ok(created) => created,
            Err(e) => {
                self.discard_image(&image_key).await;
                return Err(name_conflict(e));
            }
        };

        info!(recipe_id = %created.id, author_id = %author.id, "Recipe created");

        self.view(Some(author), created).await
    }

    /// Update a recipe. Only its author may do this.
    pub async fn update(
        &self,
        actor: &user::Model,
        recipe_id: &str,
        input: RecipeInput,
        mode: UpdateMode,
    ) -> AppResult<RecipeView> {
        let existing = self.recipe_repo.get_by_id(recipe_id).await?;
        ensure_author(actor, &existing)?;

        let fields = check_fields(&input, mode == UpdateMode::Replace)?;
        self.check_references(&fields, Some(&existing.id)).await?;

        let new_image = match input.image.as_deref() {
            Some(data) => Some(self.store_image(data).await?),
            None => None,
        };

        let mut model: recipe::ActiveModel = existing.clone().into();
        if let Some(name) = fields.name {
            model.name = Set(name);
        }
        if let Some(text) = fields.text {
            model.text = Set(text);
        }
        if let Some(cooking_time) = fields.cooking_time {
            model.cooking_time = Set(cooking_time);
        }
        if let Some(key) = &new_image {
            model.image = Set(key.clone());
        }
        let lines = fields
            .ingredients
            .as_deref()
            .map(|items| self.ingredient_lines(items));

        let updated = match self
            .recipe_repo
            .update_with_relations(model, fields.tags.as_deref(), lines)
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(key) = &new_image {
                    self.discard_image(key).await;
                }
                return Err(name_conflict(e));
            }
        };

        if new_image.is_some() {
            self.discard_image(&existing.image).await;
        }

        info!(recipe_id = %updated.id, ?mode, "Recipe updated");

        self.view(Some(actor), updated).await
    }

    /// Delete a recipe. Only its author may do this.
    pub async fn delete(&self, actor: &user::Model, recipe_id: &str) -> AppResult<()> {
        let existing = self.recipe_repo.get_by_id(recipe_id).await?;
        ensure_author(actor, &existing)?;

        if !self.recipe_repo.delete(&existing.id).await? {
            return Err(AppError::RecipeNotFound(existing.id));
        }
        self.discard_image(&existing.image).await;

        info!(recipe_id = %existing.id, "Recipe deleted");
        Ok(())
    }

    /// Get a recipe as seen by `viewer`.
    pub async fn get(&self, viewer: Option<&user::Model>, recipe_id: &str) -> AppResult<RecipeView> {
        let recipe = self.recipe_repo.get_by_id(recipe_id).await?;
        self.view(viewer, recipe).await
    }

    /// List recipes, newest first.
    pub async fn list(
        &self,
        viewer: Option<&user::Model>,
        query: &RecipeQuery,
        limit: u64,
        offset: u64,
    ) -> AppResult<Page<RecipeView>> {
        let viewer_id = viewer.map(|v| v.id.clone());
        let filter = RecipeFilter {
            author_id: query.author.clone(),
            tag_slugs: query.tags.clone(),
            favorited_by: viewer_id.clone().filter(|_| query.is_favorited),
            in_cart_of: viewer_id.filter(|_| query.is_in_shopping_cart),
        };

        let recipes = self.recipe_repo.find_filtered(&filter, limit, offset).await?;
        let count = self.recipe_repo.count_filtered(&filter).await?;

        Ok(Page::new(self.views(viewer, recipes).await?, count))
    }

    /// Build the full representation of one recipe.
    pub async fn view(
        &self,
        viewer: Option<&user::Model>,
        recipe: recipe::Model,
    ) -> AppResult<RecipeView> {
        self.views(viewer, vec![recipe])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("recipe view is missing".to_string()))
    }

    /// Build full representations for a batch of recipes with a fixed
    /// number of queries, keeping the input order.
    pub async fn views(
        &self,
        viewer: Option<&user::Model>,
        recipes: Vec<recipe::Model>,
    ) -> AppResult<Vec<RecipeView>> {
        if recipes.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = recipes.iter().map(|r| r.id.clone()).collect();

        let mut tags: HashMap<String, Vec<_>> = HashMap::new();
        for (recipe_id, tag) in self.recipe_repo.tags_for(&ids).await? {
            tags.entry(recipe_id).or_default().push(tag);
        }

        let mut ingredients: HashMap<String, Vec<RecipeIngredientView>> = HashMap::new();
        for (line, ingredient) in self.recipe_repo.ingredients_for(&ids).await? {
            ingredients
                .entry(line.recipe_id)
                .or_default()
                .push(RecipeIngredientView::new(&ingredient, line.amount));
        }

        let mut author_ids: Vec<String> = recipes.iter().map(|r| r.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();
        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let (subscribed, favorited, in_cart) = match viewer {
            Some(viewer) => (
                self.subscription_repo
                    .subscribed_author_ids(&viewer.id, &author_ids)
                    .await?,
                self.list_repo
                    .member_ids(RecipeList::Favorites, &viewer.id, &ids)
                    .await?,
                self.list_repo
                    .member_ids(RecipeList::ShoppingCart, &viewer.id, &ids)
                    .await?,
            ),
            None => (HashSet::new(), HashSet::new(), HashSet::new()),
        };

        recipes
            .into_iter()
            .map(|recipe| {
                let author = authors.get(&recipe.author_id).ok_or_else(|| {
                    AppError::Internal(format!("author of recipe {} is missing", recipe.id))
                })?;
                Ok(RecipeView {
                    tags: tags.remove(&recipe.id).unwrap_or_default(),
                    author: UserProfile::new(author, subscribed.contains(&author.id)),
                    ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                    is_favorited: favorited.contains(&recipe.id),
                    is_in_shopping_cart: in_cart.contains(&recipe.id),
                    image: self.storage.public_url(&recipe.image),
                    id: recipe.id,
                    name: recipe.name,
                    text: recipe.text,
                    cooking_time: recipe.cooking_time,
                })
            })
            .collect()
    }

    /// Checks that need the database: referenced tags and ingredients exist
    /// and the name is free.
    async fn check_references(
        &self,
        fields: &CheckedFields,
        current_id: Option<&str>,
    ) -> AppResult<()> {
        if let Some(tag_ids) = &fields.tags {
            let found: HashSet<String> = self
                .tag_repo
                .find_by_ids(tag_ids)
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect();
            if let Some(missing) = tag_ids.iter().find(|id| !found.contains(*id)) {
                return Err(AppError::field("tags", format!("tag {missing} does not exist")));
            }
        }

        if let Some(items) = &fields.ingredients {
            let ids: Vec<String> = items.iter().map(|(id, _)| id.clone()).collect();
            let found: HashSet<String> = self
                .ingredient_repo
                .find_by_ids(&ids)
                .await?
                .into_iter()
                .map(|i| i.id)
                .collect();
            if let Some(missing) = ids.iter().find(|id| !found.contains(*id)) {
                return Err(AppError::field(
                    "ingredients",
                    format!("ingredient {missing} does not exist"),
                ));
            }
        }

        if let Some(name) = &fields.name {
            let taken = self
                .recipe_repo
                .find_by_name(name)
                .await?
                .is_some_and(|other| Some(other.id.as_str()) != current_id);
            if taken {
                return Err(AppError::field("name", "a recipe with this name already exists"));
            }
        }

        Ok(())
    }

    /// Decode, size-check and store an image; returns its storage key.
    async fn store_image(&self, data_url: &str) -> AppResult<String> {
        let image = decode_image_data_url(data_url)?;
        if image.bytes.len() > self.max_upload_bytes {
            return Err(AppError::field(
                "image",
                format!("image exceeds the {} byte limit", self.max_upload_bytes),
            ));
        }

        let key = generate_storage_key(IMAGE_PREFIX, &self.id_gen.generate(), &image.extension);
        let uploaded = self
            .storage
            .upload(&key, &image.bytes, &image.content_type)
            .await?;
        Ok(uploaded.key)
    }

    async fn discard_image(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            warn!(key = %key, error = %e, "Failed to delete recipe image");
        }
    }

    fn ingredient_lines(&self, items: &[(String, i32)]) -> Vec<IngredientLine> {
        items
            .iter()
            .map(|(ingredient_id, amount)| IngredientLine {
                id: self.id_gen.generate(),
                ingredient_id: ingredient_id.clone(),
                amount: *amount,
            })
            .collect()
    }
}

fn ensure_author(actor: &user::Model, recipe: &recipe::Model) -> AppResult<()> {
    if actor.id == recipe.author_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "only the author can change this recipe".to_string(),
        ))
    }
}

/// A unique-name violation caught by the database surfaces like the pre-check.
fn name_conflict(err: AppError) -> AppError {
    match err {
        AppError::Conflict(message) => AppError::field("name", message),
        other => other,
    }
}

fn take<T: Clone>(value: Option<&T>, field: &str, required: bool) -> AppResult<Option<T>> {
    match value {
        Some(v) => Ok(Some(v.clone())),
        None if required => Err(AppError::field(field, "This field is required.")),
        None => Ok(None),
    }
}

/// Checks that need no database access, in field order.
fn check_fields(input: &RecipeInput, required: bool) -> AppResult<CheckedFields> {
    let mut fields = CheckedFields::default();

    if let Some(tags) = take(input.tags.as_ref(), "tags", required)? {
        check_tags(&tags)?;
        fields.tags = Some(tags);
    }
    if let Some(items) = take(input.ingredients.as_ref(), "ingredients", required)? {
        fields.ingredients = Some(check_ingredients(&items)?);
    }
    if let Some(name) = take(input.name.as_ref(), "name", required)? {
        fields.name = Some(check_name(&name)?);
    }
    if let Some(text) = take(input.text.as_ref(), "text", required)? {
        if text.trim().is_empty() {
            return Err(AppError::field("text", "text must not be empty"));
        }
        fields.text = Some(text);
    }
    if let Some(minutes) = take(input.cooking_time.as_ref(), "cooking_time", required)? {
        let minutes = i32::try_from(minutes)
            .ok()
            .filter(|m| *m >= 1)
            .ok_or_else(|| {
                AppError::field("cooking_time", "cooking time must be at least 1 minute")
            })?;
        fields.cooking_time = Some(minutes);
    }

    Ok(fields)
}

fn check_tags(tags: &[String]) -> AppResult<()> {
    if tags.is_empty() {
        return Err(AppError::field("tags", "at least one tag is required"));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = tags.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(AppError::field("tags", format!("tag {dup} is listed more than once")));
    }
    Ok(())
}

fn check_ingredients(items: &[IngredientAmountInput]) -> AppResult<Vec<(String, i32)>> {
    if items.is_empty() {
        return Err(AppError::field("ingredients", "at least one ingredient is required"));
    }

    let mut seen = HashSet::new();
    let mut checked = Vec::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(AppError::field(
                "ingredients",
                format!("ingredient {} is listed more than once", item.id),
            ));
        }
        let amount = i32::try_from(item.amount)
            .ok()
            .filter(|a| *a > 0)
            .ok_or_else(|| {
                AppError::field(
                    "ingredients",
                    format!("amount of ingredient {} must be a positive number", item.id),
                )
            })?;
        checked.push((item.id.clone(), amount));
    }
    Ok(checked)
}

fn check_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::field("name", "name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::field(
            "name",
            format!("name must be at most {MAX_NAME_LENGTH} characters"),
        ));
    }
    Ok(name.to_string())
}
