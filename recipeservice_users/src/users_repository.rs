pub use in_memory_users_repository::InMemoryUsersRepository;
pub use postgres_users_repository::PostgresUsersRepository;

use chrono::Utc;

use recipeservice_common::error::ApiError;
use recipeservice_common::RecordId;

use crate::api::{CartItem, User, UserProfile};

mod in_memory_users_repository;
mod postgres_users_repository;

#[derive(Debug, thiserror::Error)]
pub enum UsersRepositoryError {
    #[error("User {0} not found")]
    NotFound(RecordId),

    #[error("User with email {0} already exists")]
    DuplicateUser(String),

    #[error("Failed to deserialize user: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

impl From<UsersRepositoryError> for ApiError {
    fn from(err: UsersRepositoryError) -> Self {
        match err {
            UsersRepositoryError::NotFound(_) => ApiError::NotFound("User not found".into()),
            UsersRepositoryError::DuplicateUser(_) => {
                ApiError::Conflict("User already exists".into())
            }
            other => ApiError::internal(other),
        }
    }
}

#[async_trait::async_trait]
pub trait UsersRepository: Send + Sync {
    /// Stores a new user, emails are unique
    async fn add_user(&self, user: User) -> Result<User, UsersRepositoryError>;

    async fn get_user(&self, user_id: &RecordId) -> Result<User, UsersRepositoryError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UsersRepositoryError>;

    /// Adds the recipe to the cart, accumulating quantity when it is already there
    async fn add_to_cart(
        &self,
        user_id: &RecordId,
        recipe_id: &RecordId,
        quantity: u32,
    ) -> Result<User, UsersRepositoryError>;

    /// Removes the cart item if present. Unknown items are ignored.
    async fn remove_from_cart(
        &self,
        user_id: &RecordId,
        item_id: &RecordId,
    ) -> Result<User, UsersRepositoryError>;
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    pub fn new(username: &str, email: &str, password_hash: String) -> Self {
        Self {
            id: RecordId::generate(),
            username: username.trim().to_string(),
            email: normalize_email(email),
            password_hash,
            created_at: Utc::now(),
            cart: vec![],
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }

    pub fn add_to_cart(&mut self, recipe_id: &RecordId, quantity: u32) {
        match self.cart.iter_mut().find(|item| &item.recipe == recipe_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.cart.push(CartItem {
                id: RecordId::generate(),
                recipe: recipe_id.clone(),
                quantity,
            }),
        }
    }

    pub fn remove_from_cart(&mut self, item_id: &RecordId) {
        self.cart.retain(|item| &item.id != item_id);
    }
}
