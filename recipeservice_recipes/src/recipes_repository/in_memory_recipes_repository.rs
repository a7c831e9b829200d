use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use recipeservice_common::RecordId;

use crate::api::{Comment, LikeStatus, RatingSummary, Recipe, RecipeDetails, RecipePatch};
use crate::recipes_repository::{
    distinct_sorted, PageRequest, RecipeFilter, RecipePage, RecipesRepository,
    RecipesRepositoryError,
};

struct StoredRecipe {
    sequence: u64,
    recipe: Recipe,
}

#[derive(Default)]
pub struct InMemoryRecipesRepository {
    recipe_sequence_generator: AtomicU64,
    recipes: parking_lot::RwLock<HashMap<RecordId, StoredRecipe>>,
}

impl InMemoryRecipesRepository {
    fn modify<T>(
        &self,
        recipe_id: &RecordId,
        change: impl FnOnce(&mut Recipe) -> Result<T, RecipesRepositoryError>,
    ) -> Result<T, RecipesRepositoryError> {
        let mut locked_recipes = self.recipes.write();
        let stored = locked_recipes
            .get_mut(recipe_id)
            .ok_or_else(|| RecipesRepositoryError::NotFound(recipe_id.clone()))?;
        change(&mut stored.recipe)
    }
}

#[async_trait::async_trait]
impl RecipesRepository for InMemoryRecipesRepository {
    async fn add_recipe(&self, details: RecipeDetails) -> Result<Recipe, RecipesRepositoryError> {
        let recipe = Recipe::new(details)?;
        let sequence = self
            .recipe_sequence_generator
            .fetch_add(1, Ordering::Relaxed);
        self.recipes.write().insert(
            recipe.id.clone(),
            StoredRecipe {
                sequence,
                recipe: recipe.clone(),
            },
        );
        Ok(recipe)
    }

    async fn get_recipe(&self, recipe_id: &RecordId) -> Result<Recipe, RecipesRepositoryError> {
        self.recipes
            .read()
            .get(recipe_id)
            .map(|stored| stored.recipe.clone())
            .ok_or_else(|| RecipesRepositoryError::NotFound(recipe_id.clone()))
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<RecipePage, RecipesRepositoryError> {
        let locked_recipes = self.recipes.read();
        let mut matching: Vec<&StoredRecipe> = locked_recipes
            .values()
            .filter(|stored| filter.matches(&stored.recipe))
            .collect();
        matching.sort_by(|a, b| b.sequence.cmp(&a.sequence));

        Ok(RecipePage {
            total: matching.len() as u64,
            recipes: matching
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(page.limit as usize)
                .map(|stored| stored.recipe.clone())
                .collect(),
        })
    }

    async fn update_recipe(
        &self,
        recipe_id: &RecordId,
        patch: RecipePatch,
    ) -> Result<Recipe, RecipesRepositoryError> {
        self.modify(recipe_id, |recipe| {
            recipe.apply_patch(&patch)?;
            Ok(recipe.clone())
        })
    }

    async fn delete_recipe(&self, recipe_id: &RecordId) -> Result<(), RecipesRepositoryError> {
        self.recipes
            .write()
            .remove(recipe_id)
            .map(|_| ())
            .ok_or_else(|| RecipesRepositoryError::NotFound(recipe_id.clone()))
    }

    async fn list_cuisines(&self) -> Result<Vec<String>, RecipesRepositoryError> {
        Ok(distinct_sorted(
            self.recipes
                .read()
                .values()
                .map(|stored| stored.recipe.details.cuisine.clone()),
        ))
    }

    async fn toggle_like(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
    ) -> Result<LikeStatus, RecipesRepositoryError> {
        self.modify(recipe_id, |recipe| Ok(recipe.toggle_like(user_id)))
    }

    async fn rate_recipe(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
        rating: u8,
    ) -> Result<RatingSummary, RecipesRepositoryError> {
        self.modify(recipe_id, |recipe| {
            recipe.set_rating(user_id, rating);
            Ok(recipe.rating_summary(user_id))
        })
    }

    async fn remove_rating(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
    ) -> Result<RatingSummary, RecipesRepositoryError> {
        self.modify(recipe_id, |recipe| {
            recipe.remove_rating(user_id)?;
            Ok(recipe.rating_summary(user_id))
        })
    }

    async fn add_comment(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
        text: String,
    ) -> Result<Comment, RecipesRepositoryError> {
        self.modify(recipe_id, |recipe| Ok(recipe.add_comment(user_id, text)))
    }

    async fn delete_comment(
        &self,
        recipe_id: &RecordId,
        comment_id: &RecordId,
        user_id: &RecordId,
    ) -> Result<(), RecipesRepositoryError> {
        self.modify(recipe_id, |recipe| {
            recipe.delete_comment(comment_id, user_id)
        })
    }
}
