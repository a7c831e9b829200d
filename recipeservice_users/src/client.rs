use anyhow::{bail, Context};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;
use serde_json::json;

use recipeservice_common::envelope::ApiResponse;
use recipeservice_common::RecordId;

use crate::api::{AuthResponse, CartEntry, RegisterRequest, UserProfile};

pub struct UserServiceClient {
    url: String,
    client: ClientWithMiddleware,
}

/// Returns the envelope data or fails with the envelope message
async fn read_data<T: DeserializeOwned>(
    response: reqwest::Response,
    action: &str,
) -> anyhow::Result<T> {
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
    envelope
        .data
        .with_context(|| format!("Failed to {}, no data in response", action))
}

impl UserServiceClient {
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

    /// Calls POST /api/auth/register endpoint
    /// Returns None if the email is already registered
    pub async fn register(&self, request: &RegisterRequest) -> anyhow::Result<Option<AuthResponse>> {
        let response = self
            .client
            .post(format!("{}/api/auth/register", self.url))
            .json(request)
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            return Ok(None);
        }
        read_data(response, "register").await.map(Some)
    }

    /// Calls POST /api/auth/login endpoint
    /// Returns None for invalid credentials
    pub async fn login(&self, email: &str, password: &str) -> anyhow::Result<Option<AuthResponse>> {
        let response = self
            .client
            .post(format!("{}/api/auth/login", self.url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        read_data(response, "login").await.map(Some)
    }

    /// Calls GET /api/auth/me endpoint
    pub async fn me(&self, token: &str) -> anyhow::Result<UserProfile> {
        let response = self
            .client
            .get(format!("{}/api/auth/me", self.url))
            .bearer_auth(token)
            .send()
            .await?;
        read_data(response, "get profile").await
    }

    /// Calls GET /api/cart endpoint
    pub async fn cart(&self, token: &str) -> anyhow::Result<Vec<CartEntry>> {
        let response = self
            .client
            .get(format!("{}/api/cart", self.url))
            .bearer_auth(token)
            .send()
            .await?;
        read_data(response, "get cart").await
    }

    /// Calls POST /api/cart endpoint
    pub async fn add_to_cart(
        &self,
        recipe_id: &RecordId,
        quantity: Option<i64>,
        token: &str,
    ) -> anyhow::Result<Vec<CartEntry>> {
        let response = self
            .client
            .post(format!("{}/api/cart", self.url))
            .bearer_auth(token)
            .json(&json!({ "recipeId": recipe_id, "quantity": quantity }))
            .send()
            .await?;
        read_data(response, "add to cart").await
    }

    /// Calls DELETE /api/cart?itemId={item_id} endpoint
    pub async fn remove_from_cart(
        &self,
        item_id: &RecordId,
        token: &str,
    ) -> anyhow::Result<Vec<CartEntry>> {
        let response = self
            .client
            .delete(format!("{}/api/cart", self.url))
            .query(&[("itemId", item_id.as_str())])
            .bearer_auth(token)
            .send()
            .await?;
        read_data(response, "remove from cart").await
    }
}
