use chrono::{DateTime, Utc};
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use recipeservice_common::RecordId;

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
pub struct Ingredient {
    #[serde(default)]
    #[validate(length(min = 1, message = "Ingredient name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Ingredient amount is required"))]
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
pub struct Instruction {
    #[validate(range(min = 1, message = "Step number must be at least 1"))]
    pub step: i32,
    #[serde(default)]
    #[validate(length(min = 1, message = "Instruction description is required"))]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Validate, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// Editable part of a recipe, as submitted by clients
pub struct RecipeDetails {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Recipe name must be between 1 and 100 characters"
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Description must be between 1 and 1000 characters"
    ))]
    pub description: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Cuisine must be between 1 and 50 characters"))]
    pub cuisine: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "At least one ingredient is required"),
        nested
    )]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "At least one instruction is required"),
        nested
    )]
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Prep time cannot be negative"))]
    pub prep_time: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "Cook time cannot be negative"))]
    pub cook_time: i32,
    #[serde(default = "default_servings")]
    #[validate(range(min = 1, message = "Servings must be at least 1"))]
    pub servings: i32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_created_by")]
    pub created_by: String,
    #[serde(default = "default_is_public")]
    pub is_public: bool,
}

fn default_servings() -> i32 {
    1
}

fn default_created_by() -> String {
    "Anonymous".to_string()
}

fn default_is_public() -> bool {
    true
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// Partial update of recipe details. Only provided fields replace the current values
pub struct RecipePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<Ingredient>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<Instruction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub user: RecordId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user: RecordId,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub user: RecordId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Recipe document as stored
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub details: RecipeDetails,
    #[serde(default)]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Recipe document with the fields derived at read time
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub likes_count: usize,
    pub comments_count: usize,
    pub ratings_count: usize,
    pub average_rating: f64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct ListRecipesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub liked: bool,
    pub likes_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct RatingRequest {
    pub rating: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub ratings_count: usize,
    pub user_rating: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Apiv2Schema)]
pub struct CommentRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 500,
        message = "Comment must be between 1 and 500 characters"
    ))]
    pub text: String,
}
