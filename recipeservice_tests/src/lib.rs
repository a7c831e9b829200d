//! Helpers shared by the system and load tests. Both expect running services,
//! addressed by `RECIPES_SERVICE_URL` and `USERS_SERVICE_URL`.

use rand::distributions::Alphanumeric;
use rand::Rng;

use recipeservice_recipes::api::{Difficulty, Ingredient, Instruction, RecipeDetails};
use recipeservice_users::api::RegisterRequest;

pub fn recipes_service_url() -> String {
    std::env::var("RECIPES_SERVICE_URL").unwrap_or("http://127.0.0.1:8080".to_string())
}

pub fn users_service_url() -> String {
    std::env::var("USERS_SERVICE_URL").unwrap_or("http://127.0.0.1:8081".to_string())
}

/// Lowercase random suffix keeping names and emails unique between runs
pub fn unique_suffix(rng: &mut impl Rng) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(10)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

pub fn recipe_details(name: &str, cuisine: &str, tags: &[&str]) -> RecipeDetails {
    RecipeDetails {
        name: name.to_string(),
        description: format!("How to make {}", name),
        cuisine: cuisine.to_string(),
        image_url: String::new(),
        ingredients: vec![
            Ingredient {
                name: "Flour".to_string(),
                amount: "200 g".to_string(),
            },
            Ingredient {
                name: "Water".to_string(),
                amount: "100 ml".to_string(),
            },
        ],
        instructions: vec![
            Instruction {
                step: 1,
                description: "Mix everything".to_string(),
            },
            Instruction {
                step: 2,
                description: "Bake for 20 minutes".to_string(),
            },
        ],
        prep_time: 10,
        cook_time: 20,
        servings: 4,
        difficulty: Difficulty::Easy,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        created_by: "System tests".to_string(),
        is_public: true,
    }
}

pub fn register_request(username: &str) -> RegisterRequest {
    RegisterRequest {
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: "secret123".to_string(),
    }
}
