use std::collections::HashMap;

use anyhow::Context;
use futures_util::future::try_join_all;

use recipeservice_common::RecordId;
use recipeservice_recipes::api::RecipeView;
use recipeservice_recipes::client::RecipeServiceClient;

use crate::api::{CartEntry, CartItem};

/// Source of recipe documents for cart checks and cart views
#[async_trait::async_trait]
pub trait RecipeCatalog: Send + Sync {
    /// Returns None if the recipe does not exist
    async fn find_recipe(&self, recipe_id: &RecordId) -> anyhow::Result<Option<RecipeView>>;
}

/// Looks recipes up in the recipes service
pub struct HttpRecipeCatalog {
    client: RecipeServiceClient,
}

impl HttpRecipeCatalog {
    pub fn new(recipes_service_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: RecipeServiceClient::new(recipes_service_url)
                .context("Failed to create recipes service client")?,
        })
    }
}

#[async_trait::async_trait]
impl RecipeCatalog for HttpRecipeCatalog {
    async fn find_recipe(&self, recipe_id: &RecordId) -> anyhow::Result<Option<RecipeView>> {
        self.client
            .get_recipe(recipe_id)
            .await
            .with_context(|| format!("Failed to get recipe {}", recipe_id))
    }
}

/// Resolves every cart item into an entry with the current recipe document.
/// Each distinct recipe is fetched once, concurrently.
pub async fn resolve_cart(
    catalog: &dyn RecipeCatalog,
    cart: Vec<CartItem>,
) -> anyhow::Result<Vec<CartEntry>> {
    let mut recipe_ids: Vec<&RecordId> = cart.iter().map(|item| &item.recipe).collect();
    recipe_ids.sort();
    recipe_ids.dedup();

    let recipes = try_join_all(recipe_ids.into_iter().map(|recipe_id| async move {
        catalog
            .find_recipe(recipe_id)
            .await
            .map(|recipe| (recipe_id.clone(), recipe))
    }))
    .await?;
    let recipes: HashMap<RecordId, Option<RecipeView>> = recipes.into_iter().collect();

    Ok(cart
        .into_iter()
        .map(|item| CartEntry {
            recipe: recipes.get(&item.recipe).cloned().flatten(),
            id: item.id,
            recipe_id: item.recipe,
            quantity: item.quantity,
        })
        .collect())
}
