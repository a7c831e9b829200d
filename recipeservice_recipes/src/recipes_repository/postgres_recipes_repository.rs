use std::sync::Arc;

use tokio_postgres::Client;

use recipeservice_common::connection::{ConnectionManager, PostgresConfig};
use recipeservice_common::RecordId;

use crate::api::{Comment, LikeStatus, RatingSummary, Recipe, RecipeDetails, RecipePatch};
use crate::recipes_repository::{
    distinct_sorted, PageRequest, RecipeFilter, RecipePage, RecipesRepository,
    RecipesRepositoryError,
};

const SETUP_SQL: &str = "
        CREATE TABLE IF NOT EXISTS recipes (
            seq             BIGSERIAL,
            id              TEXT PRIMARY KEY,
            params          JSONB NOT NULL
            );
        CREATE INDEX IF NOT EXISTS recipes_cuisine_idx ON recipes ((params->>'cuisine'));
        ";

// $1 cuisine, $2 ILIKE pattern; NULL disables the condition
const FILTER_SQL: &str = "
        ($1::TEXT IS NULL OR params->>'cuisine' = $1)
        AND ($2::TEXT IS NULL
            OR params->>'name' ILIKE $2
            OR params->>'description' ILIKE $2
            OR EXISTS (SELECT 1 FROM jsonb_array_elements_text(params->'tags') AS tag WHERE tag ILIKE $2))
        ";

/// Stores every recipe as one JSONB document; `seq` keeps the insertion order
pub struct PostgresRecipesRepository {
    connections: ConnectionManager,
}

impl PostgresRecipesRepository {
    pub fn new(config: PostgresConfig) -> Self {
        Self {
            connections: ConnectionManager::new(config, SETUP_SQL),
        }
    }

    async fn client(&self) -> Result<Arc<Client>, RecipesRepositoryError> {
        Ok(self.connections.connect().await?)
    }

    async fn load(
        &self,
        client: &Client,
        recipe_id: &RecordId,
    ) -> Result<Recipe, RecipesRepositoryError> {
        let rows = client
            .query(
                "SELECT params FROM recipes WHERE id = ($1)",
                &[&recipe_id.as_str()],
            )
            .await?;

        let params: serde_json::Value = rows
            .first()
            .ok_or_else(|| RecipesRepositoryError::NotFound(recipe_id.clone()))?
            .try_get(0)?;

        Ok(serde_json::from_value(params)?)
    }

    async fn store(&self, client: &Client, recipe: &Recipe) -> Result<(), RecipesRepositoryError> {
        let updated = client
            .execute(
                "UPDATE recipes SET params = ($1) WHERE id = ($2)",
                &[&serde_json::to_value(recipe)?, &recipe.id.as_str()],
            )
            .await?;
        if updated == 0 {
            return Err(RecipesRepositoryError::NotFound(recipe.id.clone()));
        }
        Ok(())
    }

    /// Read-modify-write of a single document. Concurrent writers of the same recipe: last write wins.
    async fn modify<T: Send>(
        &self,
        recipe_id: &RecordId,
        change: impl FnOnce(&mut Recipe) -> Result<T, RecipesRepositoryError> + Send,
    ) -> Result<(T, Recipe), RecipesRepositoryError> {
        let client = self.client().await?;
        let mut recipe = self.load(&client, recipe_id).await?;
        let result = change(&mut recipe)?;
        self.store(&client, &recipe).await?;
        Ok((result, recipe))
    }
}

fn ilike_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait::async_trait]
impl RecipesRepository for PostgresRecipesRepository {
    async fn add_recipe(&self, details: RecipeDetails) -> Result<Recipe, RecipesRepositoryError> {
        let recipe = Recipe::new(details)?;
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO recipes (id, params) VALUES ($1, $2)",
                &[&recipe.id.as_str(), &serde_json::to_value(&recipe)?],
            )
            .await?;
        Ok(recipe)
    }

    async fn get_recipe(&self, recipe_id: &RecordId) -> Result<Recipe, RecipesRepositoryError> {
        let client = self.client().await?;
        self.load(&client, recipe_id).await
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<RecipePage, RecipesRepositoryError> {
        let client = self.client().await?;
        let pattern = filter.search.as_deref().map(ilike_pattern);

        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM recipes WHERE {}", FILTER_SQL),
                &[&filter.cuisine, &pattern],
            )
            .await?
            .try_get(0)?;

        let rows = client
            .query(
                &format!(
                    "SELECT params FROM recipes WHERE {} ORDER BY seq DESC LIMIT $3 OFFSET $4",
                    FILTER_SQL
                ),
                &[
                    &filter.cuisine,
                    &pattern,
                    &(page.limit as i64),
                    &(page.offset() as i64),
                ],
            )
            .await?;

        let recipes = rows
            .iter()
            .map(|row| {
                let params: serde_json::Value = row.try_get(0)?;
                Ok(serde_json::from_value(params)?)
            })
            .collect::<Result<Vec<Recipe>, RecipesRepositoryError>>()?;

        Ok(RecipePage {
            recipes,
            total: total as u64,
        })
    }

    async fn update_recipe(
        &self,
        recipe_id: &RecordId,
        patch: RecipePatch,
    ) -> Result<Recipe, RecipesRepositoryError> {
        let (_, recipe) = self
            .modify(recipe_id, |recipe| recipe.apply_patch(&patch))
            .await?;
        Ok(recipe)
    }

    async fn delete_recipe(&self, recipe_id: &RecordId) -> Result<(), RecipesRepositoryError> {
        let client = self.client().await?;
        let rows = client
            .query(
                "DELETE FROM recipes WHERE id = ($1) RETURNING id",
                &[&recipe_id.as_str()],
            )
            .await?;
        if rows.is_empty() {
            return Err(RecipesRepositoryError::NotFound(recipe_id.clone()));
        }
        Ok(())
    }

    async fn list_cuisines(&self) -> Result<Vec<String>, RecipesRepositoryError> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT DISTINCT params->>'cuisine' FROM recipes WHERE params->>'cuisine' IS NOT NULL",
                &[],
            )
            .await?;

        let cuisines = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<Result<Vec<String>, tokio_postgres::Error>>()?;
        Ok(distinct_sorted(cuisines))
    }

    async fn toggle_like(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
    ) -> Result<LikeStatus, RecipesRepositoryError> {
        let (status, _) = self
            .modify(recipe_id, |recipe| Ok(recipe.toggle_like(user_id)))
            .await?;
        Ok(status)
    }

    async fn rate_recipe(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
        rating: u8,
    ) -> Result<RatingSummary, RecipesRepositoryError> {
        self.modify(recipe_id, |recipe| {
            recipe.set_rating(user_id, rating);
            Ok(())
        })
        .await?;
        // derived values come from the stored document
        Ok(self.get_recipe(recipe_id).await?.rating_summary(user_id))
    }

    async fn remove_rating(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
    ) -> Result<RatingSummary, RecipesRepositoryError> {
        self.modify(recipe_id, |recipe| recipe.remove_rating(user_id))
            .await?;
        Ok(self.get_recipe(recipe_id).await?.rating_summary(user_id))
    }

    async fn add_comment(
        &self,
        recipe_id: &RecordId,
        user_id: &RecordId,
        text: String,
    ) -> Result<Comment, RecipesRepositoryError> {
        let (comment, _) = self
            .modify(recipe_id, |recipe| Ok(recipe.add_comment(user_id, text)))
            .await?;
        Ok(comment)
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
        .await?;
        Ok(())
    }
}
