#![cfg(feature = "load_tests")]

use rand::prelude::SliceRandom;
use rand::{thread_rng, Rng};

use recipeservice_recipes::api::RecipeDetails;
use recipeservice_recipes::client::RecipeServiceClient;
use recipeservice_tests::{
    recipe_details, recipes_service_url, register_request, unique_suffix, users_service_url,
};
use recipeservice_users::client::UserServiceClient;

#[tokio::test]
async fn generate_lots_of_recipes_and_user_activity() {
    const NO_OF_RECIPES_TO_GENERATE: usize = 50;
    const NO_OF_USERS_TO_GENERATE: usize = 10;
    const NO_OF_ACTIONS: usize = 200;

    let mut rng = thread_rng();
    let recipes_client =
        RecipeServiceClient::new(&recipes_service_url()).expect("Failed to create client");
    let users_client =
        UserServiceClient::new(&users_service_url()).expect("Failed to create users client");

    let mut recipe_ids = vec![];
    for recipe in generate_recipes(&mut rng, NO_OF_RECIPES_TO_GENERATE) {
        let created = recipes_client
            .add_recipe(&recipe)
            .await
            .expect("Failed to add recipe");
        println!("Added recipe {}", created.recipe.id);
        recipe_ids.push(created.recipe.id);
    }

    let mut tokens = vec![];
    for no in 0..NO_OF_USERS_TO_GENERATE {
        let username = format!(
            "{}{}{}",
            FIRST_NAMES.choose(&mut rng).unwrap().to_lowercase(),
            no,
            unique_suffix(&mut rng)
        );
        let registered = users_client
            .register(&register_request(&username))
            .await
            .expect("Failed to register")
            .expect("User already exists");
        println!("Registered user {}", registered.user.id);
        tokens.push(registered.token);
    }

    for _ in 0..NO_OF_ACTIONS {
        let recipe_id = recipe_ids.choose(&mut rng).unwrap();
        let token = tokens.choose(&mut rng).unwrap();
        match rng.gen_range(0..4) {
            0 => {
                let status = recipes_client
                    .toggle_like(recipe_id, token)
                    .await
                    .expect("Failed to toggle like");
                println!("Like of {} is now {}", recipe_id, status.liked);
            }
            1 => {
                let rating = rng.gen_range(1..=5);
                let summary = recipes_client
                    .rate_recipe(recipe_id, rating as f64, token)
                    .await
                    .expect("Failed to rate recipe");
                assert_eq!(summary.user_rating, Some(rating));
                println!("Rated {} with {}", recipe_id, rating);
            }
            2 => {
                recipes_client
                    .add_comment(recipe_id, "Tried it, worked well", token)
                    .await
                    .expect("Failed to comment");
                println!("Commented {}", recipe_id);
            }
            _ => {
                let cart = users_client
                    .add_to_cart(recipe_id, Some(rng.gen_range(1..3)), token)
                    .await
                    .expect("Failed to add to cart");
                assert!(cart.iter().any(|entry| &entry.recipe_id == recipe_id));
                println!("Added {} to cart", recipe_id);
            }
        }
    }
}

fn generate_recipes(rng: &mut impl Rng, no_of_recipes_to_generate: usize) -> Vec<RecipeDetails> {
    (0..no_of_recipes_to_generate)
        .map(|no| {
            let dish = DISHES.choose(rng).unwrap();
            let cuisine = CUISINES.choose(rng).unwrap();
            let no_of_tags = rng.gen_range(0..3);
            let tags: Vec<&str> = TAGS.choose_multiple(rng, no_of_tags).cloned().collect();
            let mut details = recipe_details(&format!("{} no {}", dish, no), cuisine, &tags);
            details.prep_time = rng.gen_range(0..60);
            details.cook_time = rng.gen_range(0..120);
            details.servings = rng.gen_range(1..8);
            details
        })
        .collect()
}

const DISHES: [&str; 12] = [
    "Pancakes",
    "Lasagne",
    "Ramen",
    "Tacos",
    "Curry",
    "Risotto",
    "Goulash",
    "Paella",
    "Pierogi",
    "Falafel",
    "Pad thai",
    "Moussaka",
];

const CUISINES: [&str; 8] = [
    "Italian", "Japanese", "Mexican", "Indian", "Spanish", "Polish", "Thai", "Greek",
];

const TAGS: [&str; 6] = ["quick", "vegetarian", "spicy", "dessert", "budget", "family"];

const FIRST_NAMES: [&str; 12] = [
    "Ryan", "Dorothy", "Jacob", "Amy", "Nicholas", "Kathleen", "Gary", "Angela", "Eric",
    "Shirley", "Jonathan", "Emma",
];
