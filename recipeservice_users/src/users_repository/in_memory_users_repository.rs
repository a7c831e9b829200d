use std::collections::HashMap;

use recipeservice_common::RecordId;

use crate::api::User;
use crate::users_repository::{normalize_email, UsersRepository, UsersRepositoryError};

#[derive(Default)]
pub struct InMemoryUsersRepository {
    users: parking_lot::RwLock<HashMap<RecordId, User>>,
}

impl InMemoryUsersRepository {
    fn modify(
        &self,
        user_id: &RecordId,
        change: impl FnOnce(&mut User),
    ) -> Result<User, UsersRepositoryError> {
        let mut locked_users = self.users.write();
        let user = locked_users
            .get_mut(user_id)
            .ok_or_else(|| UsersRepositoryError::NotFound(user_id.clone()))?;
        change(user);
        Ok(user.clone())
    }
}

#[async_trait::async_trait]
impl UsersRepository for InMemoryUsersRepository {
    async fn add_user(&self, user: User) -> Result<User, UsersRepositoryError> {
        let mut locked_users = self.users.write();
        if locked_users
            .values()
            .any(|existing| existing.email == user.email)
        {
            return Err(UsersRepositoryError::DuplicateUser(user.email));
        }
        locked_users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: &RecordId) -> Result<User, UsersRepositoryError> {
        self.users
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| UsersRepositoryError::NotFound(user_id.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UsersRepositoryError> {
        let email = normalize_email(email);
        Ok(self
            .users
            .read()
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn add_to_cart(
        &self,
        user_id: &RecordId,
        recipe_id: &RecordId,
        quantity: u32,
    ) -> Result<User, UsersRepositoryError> {
        self.modify(user_id, |user| user.add_to_cart(recipe_id, quantity))
    }

    async fn remove_from_cart(
        &self,
        user_id: &RecordId,
        item_id: &RecordId,
    ) -> Result<User, UsersRepositoryError> {
        self.modify(user_id, |user| user.remove_from_cart(item_id))
    }
}
