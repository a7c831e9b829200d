use anyhow::{bail, Context};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;
use serde_json::json;

use recipeservice_common::envelope::{ApiResponse, Pagination};
use recipeservice_common::RecordId;

use crate::api::{
    Comment, LikeStatus, ListRecipesQuery, RatingSummary, RecipeDetails, RecipePatch, RecipeView,
};

pub struct RecipeServiceClient {
    url: String,
    client: ClientWithMiddleware,
}

/// Reads the envelope and fails with its message when the call was not successful
async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    action: &str,
) -> anyhow::Result<ApiResponse<T>> {
    let status = response.status();
    let envelope: ApiResponse<T> = response
        .json()
        .await
        .with_context(|| format!("Failed to {}, invalid response body", action))?;
    if !status.is_success() || !envelope.success {
        bail!(
            "Failed to {} ({}): {}",
            action,
            status,
            envelope.message.unwrap_or_default()
        )
    }
    Ok(envelope)
}

async fn read_data<T: DeserializeOwned>(
    response: reqwest::Response,
    action: &str,
) -> anyhow::Result<T> {
    read_envelope(response, action)
        .await?
        .data
        .with_context(|| format!("Failed to {}, no data in response", action))
}

impl RecipeServiceClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request.bearer_auth(token)
    }

    /// Calls GET /health endpoint
    pub async fn health(&self) -> anyhow::Result<bool> {
        let response = self
            .client
            .get(format!("{}/health", self.url))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// Calls POST /api/recipes endpoint
    pub async fn add_recipe(&self, details: &RecipeDetails) -> anyhow::Result<RecipeView> {
        let response = self
            .client
            .post(format!("{}/api/recipes", self.url))
            .json(details)
            .send()
            .await?;
        read_data(response, "add recipe").await
    }

    /// Calls GET /api/recipes/{recipe_id} endpoint
    /// Returns None if recipe is not in the repository
    pub async fn get_recipe(&self, recipe_id: &RecordId) -> anyhow::Result<Option<RecipeView>> {
        let response = self
            .client
            .get(format!("{}/api/recipes/{}", self.url, recipe_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_data(response, "get recipe").await.map(Some)
    }

    /// Calls GET /api/recipes endpoint with the given filters and page
    pub async fn list_recipes(
        &self,
        query: &ListRecipesQuery,
    ) -> anyhow::Result<(Vec<RecipeView>, Pagination)> {
        let response = self
            .client
            .get(format!("{}/api/recipes", self.url))
            .query(query)
            .send()
            .await?;
        let envelope = read_envelope::<Vec<RecipeView>>(response, "list recipes").await?;
        Ok((
            envelope.data.unwrap_or_default(),
            envelope.pagination.context("No pagination in response")?,
        ))
    }

    /// Calls PUT /api/recipes/{recipe_id} endpoint
    pub async fn update_recipe(
        &self,
        recipe_id: &RecordId,
        patch: &RecipePatch,
    ) -> anyhow::Result<RecipeView> {
        let response = self
            .client
            .put(format!("{}/api/recipes/{}", self.url, recipe_id))
            .json(patch)
            .send()
            .await?;
        read_data(response, "update recipe").await
    }

    /// Calls DELETE /api/recipes/{recipe_id} endpoint
    /// Returns false if recipe was not found
    pub async fn delete_recipe(&self, recipe_id: &RecordId) -> anyhow::Result<bool> {
        let response = self
            .client
            .delete(format!("{}/api/recipes/{}", self.url, recipe_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        read_envelope::<serde_json::Value>(response, "delete recipe").await?;
        Ok(true)
    }

    /// Calls GET /api/cuisines endpoint
    pub async fn list_cuisines(&self) -> anyhow::Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/cuisines", self.url))
            .send()
            .await?;
        read_data(response, "list cuisines").await
    }

    /// Calls POST /api/recipes/{recipe_id}/like endpoint
    pub async fn toggle_like(&self, recipe_id: &RecordId, token: &str) -> anyhow::Result<LikeStatus> {
        let request = self
            .client
            .post(format!("{}/api/recipes/{}/like", self.url, recipe_id));
        let response = self.authorized(request, token).send().await?;
        read_data(response, "toggle like").await
    }

    /// Calls POST /api/recipes/{recipe_id}/rating endpoint, rating 0 removes the rating
    pub async fn rate_recipe(
        &self,
        recipe_id: &RecordId,
        rating: f64,
        token: &str,
    ) -> anyhow::Result<RatingSummary> {
        let request = self
            .client
            .post(format!("{}/api/recipes/{}/rating", self.url, recipe_id))
            .json(&json!({ "rating": rating }));
        let response = self.authorized(request, token).send().await?;
        read_data(response, "rate recipe").await
    }

    /// Calls DELETE /api/recipes/{recipe_id}/rating endpoint
    pub async fn remove_rating(
        &self,
        recipe_id: &RecordId,
        token: &str,
    ) -> anyhow::Result<RatingSummary> {
        let request = self
            .client
            .delete(format!("{}/api/recipes/{}/rating", self.url, recipe_id));
        let response = self.authorized(request, token).send().await?;
        read_data(response, "remove rating").await
    }

    /// Calls GET /api/recipes/{recipe_id}/comments endpoint
    pub async fn list_comments(&self, recipe_id: &RecordId) -> anyhow::Result<Vec<Comment>> {
        let response = self
            .client
            .get(format!("{}/api/recipes/{}/comments", self.url, recipe_id))
            .send()
            .await?;
        read_data(response, "list comments").await
    }

    /// Calls POST /api/recipes/{recipe_id}/comments endpoint
    pub async fn add_comment(
        &self,
        recipe_id: &RecordId,
        text: &str,
        token: &str,
    ) -> anyhow::Result<Comment> {
        let request = self
            .client
            .post(format!("{}/api/recipes/{}/comments", self.url, recipe_id))
            .json(&json!({ "text": text }));
        let response = self.authorized(request, token).send().await?;
        read_data(response, "add comment").await
    }

    /// Calls DELETE /api/recipes/{recipe_id}/comments/{comment_id} endpoint
    /// Returns false if the caller is not the author of the comment
    pub async fn delete_comment(
        &self,
        recipe_id: &RecordId,
        comment_id: &RecordId,
        token: &str,
    ) -> anyhow::Result<bool> {
        let request = self.client.delete(format!(
            "{}/api/recipes/{}/comments/{}",
            self.url, recipe_id, comment_id
        ));
        let response = self.authorized(request, token).send().await?;
        if response.status() == StatusCode::FORBIDDEN {
            return Ok(false);
        }
        read_envelope::<serde_json::Value>(response, "delete comment").await?;
        Ok(true)
    }
}
