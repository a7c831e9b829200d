use std::sync::Arc;

use tokio_postgres::error::SqlState;
use tokio_postgres::Client;

use recipeservice_common::connection::{ConnectionManager, PostgresConfig};
use recipeservice_common::RecordId;

use crate::api::User;
use crate::users_repository::{normalize_email, UsersRepository, UsersRepositoryError};

const SETUP_SQL: &str = "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            email           TEXT NOT NULL UNIQUE,
            params          JSONB NOT NULL
            );
        ";

/// Stores every user as one JSONB document, the email column backs the unique constraint
pub struct PostgresUsersRepository {
    connections: ConnectionManager,
}

impl PostgresUsersRepository {
    pub fn new(config: PostgresConfig) -> Self {
        Self {
            connections: ConnectionManager::new(config, SETUP_SQL),
        }
    }

    async fn client(&self) -> Result<Arc<Client>, UsersRepositoryError> {
        Ok(self.connections.connect().await?)
    }

    async fn load(&self, client: &Client, user_id: &RecordId) -> Result<User, UsersRepositoryError> {
        let rows = client
            .query(
                "SELECT params FROM users WHERE id = ($1)",
                &[&user_id.as_str()],
            )
            .await?;

        let params: serde_json::Value = rows
            .first()
            .ok_or_else(|| UsersRepositoryError::NotFound(user_id.clone()))?
            .try_get(0)?;

        Ok(serde_json::from_value(params)?)
    }

    /// Read-modify-write of a single document, last write wins
    async fn modify(
        &self,
        user_id: &RecordId,
        change: impl FnOnce(&mut User) + Send,
    ) -> Result<User, UsersRepositoryError> {
        let client = self.client().await?;
        let mut user = self.load(&client, user_id).await?;
        change(&mut user);

        let updated = client
            .execute(
                "UPDATE users SET params = ($1) WHERE id = ($2)",
                &[&serde_json::to_value(&user)?, &user.id.as_str()],
            )
            .await?;
        if updated == 0 {
            return Err(UsersRepositoryError::NotFound(user.id));
        }
        Ok(user)
    }
}

#[async_trait::async_trait]
impl UsersRepository for PostgresUsersRepository {
    async fn add_user(&self, user: User) -> Result<User, UsersRepositoryError> {
        let client = self.client().await?;
        let inserted = client
            .execute(
                "INSERT INTO users (id, email, params) VALUES ($1, $2, $3)",
                &[
                    &user.id.as_str(),
                    &user.email.as_str(),
                    &serde_json::to_value(&user)?,
                ],
            )
            .await;

        match inserted {
            Ok(_) => Ok(user),
            Err(err) if err.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
                Err(UsersRepositoryError::DuplicateUser(user.email))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_user(&self, user_id: &RecordId) -> Result<User, UsersRepositoryError> {
        let client = self.client().await?;
        self.load(&client, user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UsersRepositoryError> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT params FROM users WHERE email = ($1)",
                &[&normalize_email(email)],
            )
            .await?;

        match rows.first() {
            Some(row) => {
                let params: serde_json::Value = row.try_get(0)?;
                Ok(Some(serde_json::from_value(params)?))
            }
            None => Ok(None),
        }
    }

    async fn add_to_cart(
        &self,
        user_id: &RecordId,
        recipe_id: &RecordId,
        quantity: u32,
    ) -> Result<User, UsersRepositoryError> {
        self.modify(user_id, |user| user.add_to_cart(recipe_id, quantity))
            .await
    }

    async fn remove_from_cart(
        &self,
        user_id: &RecordId,
        item_id: &RecordId,
    ) -> Result<User, UsersRepositoryError> {
        self.modify(user_id, |user| user.remove_from_cart(item_id))
            .await
    }
}
