pub use in_memory_recipes_repository::InMemoryRecipesRepository;
pub use postgres_recipes_repository::PostgresRecipesRepository;

use chrono::Utc;
use serde_json::json;
use validator::Validate;

use recipeservice_common::error::{validation_message, ApiError};
use recipeservice_common::RecordId;

use crate::api::{
    Comment, Like, LikeStatus, ListRecipesQuery, Rating, RatingSummary, Recipe, RecipeDetails,
    RecipePatch, RecipeView, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

mod in_memory_recipes_repository;
mod postgres_recipes_repository;

#[derive(Debug, thiserror::Error)]
pub enum RecipesRepositoryError {
    #[error("Recipe {0} not found")]
    NotFound(RecordId),

    #[error("No rating found to remove")]
    RatingNotFound,

    #[error("Comment {0} not found")]
    CommentNotFound(RecordId),

    #[error("Comment {0} belongs to a different user")]
    NotCommentAuthor(RecordId),

    #[error("{0}")]
    Validation(String),

    #[error("Failed to deserialize recipe: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

impl From<RecipesRepositoryError> for ApiError {
    fn from(err: RecipesRepositoryError) -> Self {
        match err {
            RecipesRepositoryError::NotFound(_) => ApiError::NotFound("Recipe not found".into()),
            RecipesRepositoryError::RatingNotFound => {
                ApiError::NotFound("No rating found to remove".into())
            }
            RecipesRepositoryError::CommentNotFound(_) => {
                ApiError::NotFound("Comment not found".into())
            }
            RecipesRepositoryError::NotCommentAuthor(_) => {
                ApiError::Forbidden("You can only delete your own comments".into())
            }
            RecipesRepositoryError::Validation(message) => ApiError::Validation(message),
            other => ApiError::internal(other),
        }
    }
}

/// Filter of the recipe list. Empty values mean no filtering.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Exact cuisine match
    pub cuisine: Option<String>,
    /// Case-insensitive substring of name, description or any tag
    pub search: Option<String>,
}

impl RecipeFilter {
    pub fn matches(&self, recipe: &Recipe) -> bool {
        if let Some(cuisine) = &self.cuisine {
            if &recipe.details.cuisine != cuisine {
                return false;
            }
        }
        match &self.search {
            Some(search) => {
                let needle = search.to_lowercase();
                let details = &recipe.details;
                details.name.to_lowercase().contains(&needle)
                    || details.description.to_lowercase().contains(&needle)
                    || details
                        .tags
                        .iter()
                        .any(|tag| tag.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-indexed
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Saturates at `i64::MAX`, the largest OFFSET postgres accepts
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListRecipesQuery {
    pub fn filter(&self) -> RecipeFilter {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        RecipeFilter {
            cuisine: non_blank(&self.cuisine),
            search: non_blank(&self.search),
        }
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page.unwrap_or(1).max(1) as u64,
            limit: (self.limit.unwrap_or(DEFAULT_PAGE_SIZE as i64).max(1) as u64)
                .min(MAX_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipePage {
    /// Newest first
    pub recipes: Vec<Recipe>,
    pub total: u64,
}

#[async_trait::async_trait]
pub trait RecipesRepository: Send + Sync {
    /// Validates and stores a new recipe
    async fn add_recipe(&self, details: RecipeDetails) -> Result<Recipe, RecipesRepositoryError>;

    async fn get_recipe(&self, recipe_id: &RecordId) -> Result<Recipe, RecipesRepositoryError>;

    /// Lists one page of recipes matching the filter, newest first, with the total match count
    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<RecipePage, RecipesRepositoryError>;

    /// Merges the patch into the recipe and validates the result before storing it
    async fn update_recipe(
        &self,
        recipe_id: &RecordId,
        patch: RecipePatch,
    ) -> Result<Recipe, RecipesRepositoryError>;

    async fn delete_recipe(&self, recipe_id: &RecordId) -> Result<(), RecipesRepositoryError>;

    /// Distinct cuisines of all recipes, sorted alphabetically
    async fn list_cuisines(&self) -> Result<Vec<String>, RecipesRepositoryError>;

    async fn toggle_like(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
    ) -> Result<LikeStatus, RecipesRepositoryError>;

    /// Sets the user's rating (1..=5), replacing an earlier one
    async fn rate_recipe(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
        rating: u8,
    ) -> Result<RatingSummary, RecipesRepositoryError>;

    /// Fails with `RatingNotFound` when the user has not rated the recipe
    async fn remove_rating(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
    ) -> Result<RatingSummary, RecipesRepositoryError>;

    async fn add_comment(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
        text: String,
    ) -> Result<Comment, RecipesRepositoryError>;

    /// Only the author of the comment may delete it
    async fn delete_comment(
        &self,
        recipe_id: &RecordId,
        comment_id: &RecordId,
        user_id: &RecordId,
    ) -> Result<(), RecipesRepositoryError>;
}

impl RecipeDetails {
    /// Trims text fields, drops blank and duplicate tags, then checks the field constraints
    pub fn validated(mut self) -> Result<Self, RecipesRepositoryError> {
        self.name = self.name.trim().to_string();
        self.description = self.description.trim().to_string();
        self.cuisine = self.cuisine.trim().to_string();
        self.image_url = self.image_url.trim().to_string();

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags.iter().map(|tag| tag.trim()) {
            if !tag.is_empty() && !tags.iter().any(|existing| existing == tag) {
                tags.push(tag.to_string());
            }
        }
        self.tags = tags;

        self.validate()
            .map_err(|errors| RecipesRepositoryError::Validation(validation_message(&errors)))?;
        Ok(self)
    }
}

impl Recipe {
    pub fn new(details: RecipeDetails) -> Result<Self, RecipesRepositoryError> {
        let now = Utc::now();
        Ok(Self {
            id: RecordId::generate(),
            details: details.validated()?,
            likes: vec![],
            ratings: vec![],
            comments: vec![],
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: &RecipePatch) -> Result<(), RecipesRepositoryError> {
        let mut merged = json!(self.details);
        json_patch::merge(&mut merged, &json!(patch));
        let details: RecipeDetails = serde_json::from_value(merged)
            .map_err(|err| RecipesRepositoryError::Validation(err.to_string()))?;
        self.details = details.validated()?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Mean of all ratings rounded to one decimal, 0 without ratings
    pub fn average_rating(&self) -> f64 {
        if self.ratings.is_empty() {
            return 0.0;
        }
        let sum: u32 = self.ratings.iter().map(|rating| rating.rating as u32).sum();
        let mean = sum as f64 / self.ratings.len() as f64;
        (mean * 10.0).round() / 10.0
    }

    pub fn toggle_like(&mut self, user_id: &RecordId) -> LikeStatus {
        let likes_before = self.likes.len();
        self.likes.retain(|like| &like.user != user_id);
        let liked = self.likes.len() == likes_before;
        if liked {
            self.likes.push(Like {
                user: user_id.clone(),
                created_at: Utc::now(),
            });
        }
        LikeStatus {
            liked,
            likes_count: self.likes.len(),
        }
    }

    pub fn set_rating(&mut self, user_id: &RecordId, rating: u8) {
        match self.ratings.iter_mut().find(|r| &r.user == user_id) {
            Some(existing) => existing.rating = rating,
            None => self.ratings.push(Rating {
                user: user_id.clone(),
                rating,
                created_at: Utc::now(),
            }),
        }
    }

    pub fn remove_rating(&mut self, user_id: &RecordId) -> Result<(), RecipesRepositoryError> {
        let ratings_before = self.ratings.len();
        self.ratings.retain(|rating| &rating.user != user_id);
        if self.ratings.len() == ratings_before {
            return Err(RecipesRepositoryError::RatingNotFound);
        }
        Ok(())
    }

    pub fn rating_summary(&self, user_id: &RecordId) -> RatingSummary {
        RatingSummary {
            average_rating: self.average_rating(),
            ratings_count: self.ratings.len(),
            user_rating: self
                .ratings
                .iter()
                .find(|rating| &rating.user == user_id)
                .map(|rating| rating.rating),
        }
    }

    pub fn add_comment(&mut self, user_id: &RecordId, text: String) -> Comment {
        let now = Utc::now();
        let comment = Comment {
            id: RecordId::generate(),
            user: user_id.clone(),
            text: text.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.comments.push(comment.clone());
        comment
    }

    pub fn delete_comment(
        &mut self,
        comment_id: &RecordId,
        user_id: &RecordId,
    ) -> Result<(), RecipesRepositoryError> {
        let position = self
            .comments
            .iter()
            .position(|comment| &comment.id == comment_id)
            .ok_or_else(|| RecipesRepositoryError::CommentNotFound(comment_id.clone()))?;
        if &self.comments[position].user != user_id {
            return Err(RecipesRepositoryError::NotCommentAuthor(comment_id.clone()));
        }
        self.comments.remove(position);
        Ok(())
    }
}

impl From<Recipe> for RecipeView {
    fn from(recipe: Recipe) -> Self {
        Self {
            likes_count: recipe.likes.len(),
            comments_count: recipe.comments.len(),
            ratings_count: recipe.ratings.len(),
            average_rating: recipe.average_rating(),
            recipe,
        }
    }
}

/// Sorts and deduplicates cuisine names
pub(crate) fn distinct_sorted(cuisines: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut cuisines: Vec<String> = cuisines.into_iter().collect();
    cuisines.sort();
    cuisines.dedup();
    cuisines
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use crate::api::{Difficulty, Ingredient, Instruction, RecipeDetails};

    pub fn recipe_details(name: &str, cuisine: &str) -> RecipeDetails {
        RecipeDetails {
            name: name.to_string(),
            description: format!("How to make {}", name),
            cuisine: cuisine.to_string(),
            image_url: String::new(),
            ingredients: vec![Ingredient {
                name: "Flour".to_string(),
                amount: "200 g".to_string(),
            }],
            instructions: vec![Instruction {
                step: 1,
                description: "Mix everything".to_string(),
            }],
            prep_time: 10,
            cook_time: 20,
            servings: 2,
            difficulty: Difficulty::Easy,
            tags: vec!["dinner".to_string()],
            created_by: "Tester".to_string(),
            is_public: true,
        }
    }
}
