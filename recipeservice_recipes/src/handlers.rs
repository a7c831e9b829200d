use std::sync::Arc;

use actix_web::http::header::LOCATION;
use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};
use validator::Validate;

use recipeservice_common::auth::AuthenticatedUser;
use recipeservice_common::envelope::{ApiResponse, Pagination};
use recipeservice_common::error::ApiError;
use recipeservice_common::RecordId;

use crate::api::{
    CommentRequest, ListRecipesQuery, RatingRequest, RecipeDetails, RecipePatch, RecipeView,
};
use crate::recipes_repository::RecipesRepository;

type Repository = Data<Arc<dyn RecipesRepository>>;

fn parse_recipe_id(recipe_id: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(recipe_id).map_err(|_| ApiError::Validation("Invalid recipe ID".into()))
}

/// Accepts integers 0..=5, 0 meaning removal
fn parse_rating(rating: f64) -> Result<u8, ApiError> {
    if rating.fract() == 0.0 && (0.0..=5.0).contains(&rating) {
        Ok(rating as u8)
    } else {
        Err(ApiError::Validation("Rating must be between 1 and 5".into()))
    }
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn list_recipes(
    recipes_repository: Repository,
    query: web::Query<ListRecipesQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page_request();
    let result = recipes_repository
        .list_recipes(&query.filter(), page)
        .await?;

    let recipes: Vec<RecipeView> = result.recipes.into_iter().map(RecipeView::from).collect();
    Ok(ApiResponse::success(recipes)
        .with_pagination(Pagination::new(page.page, page.limit, result.total))
        .ok())
}

#[api_v2_operation]
pub async fn create_recipe(
    recipes_repository: Repository,
    details: web::Json<RecipeDetails>,
) -> Result<HttpResponse, ApiError> {
    let recipe = recipes_repository.add_recipe(details.into_inner()).await?;
    tracing::info!("Created recipe {}", recipe.id);

    Ok(HttpResponse::Created()
        .append_header((LOCATION, format!("/api/recipes/{}", recipe.id)))
        .json(ApiResponse::success(RecipeView::from(recipe))))
}

#[api_v2_operation]
pub async fn get_recipe(
    recipes_repository: Repository,
    recipe_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let recipe = recipes_repository.get_recipe(&recipe_id).await?;
    Ok(ApiResponse::success(RecipeView::from(recipe)).ok())
}

#[api_v2_operation]
pub async fn update_recipe(
    recipes_repository: Repository,
    recipe_id: web::Path<String>,
    patch: web::Json<RecipePatch>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let recipe = recipes_repository
        .update_recipe(&recipe_id, patch.into_inner())
        .await?;
    Ok(ApiResponse::success(RecipeView::from(recipe)).ok())
}

#[api_v2_operation]
pub async fn delete_recipe(
    recipes_repository: Repository,
    recipe_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    recipes_repository.delete_recipe(&recipe_id).await?;
    tracing::info!("Deleted recipe {}", recipe_id);
    Ok(ApiResponse::message_only("Recipe deleted successfully").ok())
}

#[api_v2_operation]
pub async fn toggle_like(
    recipes_repository: Repository,
    recipe_id: web::Path<String>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let status = recipes_repository
        .toggle_like(&recipe_id, &user.user_id)
        .await?;
    let message = if status.liked {
        "Recipe liked"
    } else {
        "Recipe unliked"
    };
    Ok(ApiResponse::success(status).with_message(message).ok())
}

#[api_v2_operation]
pub async fn rate_recipe(
    recipes_repository: Repository,
    recipe_id: web::Path<String>,
    user: AuthenticatedUser,
    request: web::Json<RatingRequest>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let rating = parse_rating(request.rating)?;

    let (summary, message) = if rating == 0 {
        let summary = recipes_repository
            .remove_rating(&recipe_id, &user.user_id)
            .await?;
        (summary, "Rating removed")
    } else {
        let summary = recipes_repository
            .rate_recipe(&recipe_id, &user.user_id, rating)
            .await?;
        (summary, "Rating saved")
    };
    Ok(ApiResponse::success(summary).with_message(message).ok())
}

#[api_v2_operation]
pub async fn remove_rating(
    recipes_repository: Repository,
    recipe_id: web::Path<String>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let summary = recipes_repository
        .remove_rating(&recipe_id, &user.user_id)
        .await?;
    Ok(ApiResponse::success(summary)
        .with_message("Rating removed")
        .ok())
}

#[api_v2_operation]
pub async fn list_comments(
    recipes_repository: Repository,
    recipe_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let recipe = recipes_repository.get_recipe(&recipe_id).await?;
    Ok(ApiResponse::success(recipe.comments).ok())
}

#[api_v2_operation]
pub async fn add_comment(
    recipes_repository: Repository,
    recipe_id: web::Path<String>,
    user: AuthenticatedUser,
    request: web::Json<CommentRequest>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let mut request = request.into_inner();
    request.text = request.text.trim().to_string();
    request.validate()?;

    let comment = recipes_repository
        .add_comment(&recipe_id, &user.user_id, request.text)
        .await?;
    Ok(ApiResponse::success(comment).respond(StatusCode::CREATED))
}

#[api_v2_operation]
pub async fn delete_comment(
    recipes_repository: Repository,
    path: web::Path<(String, String)>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let (recipe_id, comment_id) = path.into_inner();
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let comment_id = RecordId::parse(&comment_id)
        .map_err(|_| ApiError::Validation("Invalid comment ID".into()))?;

    recipes_repository
        .delete_comment(&recipe_id, &comment_id, &user.user_id)
        .await?;
    Ok(ApiResponse::message_only("Comment deleted successfully").ok())
}

#[api_v2_operation]
pub async fn list_cuisines(recipes_repository: Repository) -> Result<HttpResponse, ApiError> {
    let cuisines = recipes_repository.list_cuisines().await?;
    Ok(ApiResponse::success(cuisines).ok())
}

#[cfg(test)]
mod handler_tests {
    use actix_web::body::MessageBody;
    use actix_web::dev::ServiceResponse;
    use actix_web::http::header::AUTHORIZATION;
    use actix_web::{test, App};
    use paperclip::actix::OpenApiExt;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};

    use recipeservice_common::auth::JwtKeys;
    use recipeservice_common::envelope::ApiResponse;
    use recipeservice_common::error::{json_error_handler, query_error_handler};

    use super::*;
    use crate::api::{LikeStatus, RatingSummary};
    use crate::app_config::config_app;
    use crate::recipes_repository::test_fixtures::recipe_details;
    use crate::recipes_repository::InMemoryRecipesRepository;

    fn keys() -> JwtKeys {
        JwtKeys::new("handler-tests", chrono::Duration::hours(1)).unwrap()
    }

    fn bearer(user_id: &RecordId) -> (actix_web::http::header::HeaderName, String) {
        (AUTHORIZATION, format!("Bearer {}", keys().issue(user_id).unwrap()))
    }

    macro_rules! init_app {
        () => {{
            let repository: Arc<dyn RecipesRepository> =
                Arc::new(InMemoryRecipesRepository::default());
            test::init_service(
                App::new()
                    .wrap_api()
                    .app_data(web::Data::new(repository))
                    .app_data(web::Data::new(keys()))
                    .app_data(actix_web::web::JsonConfig::default().error_handler(json_error_handler))
                    .app_data(actix_web::web::QueryConfig::default().error_handler(query_error_handler))
                    .configure(config_app)
                    .build(),
            )
            .await
        }};
    }

    macro_rules! create {
        ($app:expr, $name:expr, $cuisine:expr) => {{
            let response = test::call_service(
                &$app,
                test::TestRequest::post()
                    .uri("/api/recipes")
                    .set_json(recipe_details($name, $cuisine))
                    .to_request(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            assert!(response.headers().contains_key(LOCATION));
            read_envelope::<RecipeView>(response).await.data.unwrap()
        }};
    }

    async fn read_envelope<T: DeserializeOwned>(
        response: ServiceResponse<impl MessageBody>,
    ) -> ApiResponse<T> {
        test::read_body_json(response).await
    }

    #[actix_web::test]
    async fn test_create_and_get_recipe() {
        let app = init_app!();
        let created = create!(app, "Pasta", "Italian");
        assert_eq!(created.likes_count, 0);
        assert_eq!(created.average_rating, 0.0);

        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/recipes/{}", created.recipe.id))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let envelope = read_envelope::<RecipeView>(response).await;
        assert!(envelope.success);
        assert_eq!(envelope.data.unwrap(), created);
    }

    #[actix_web::test]
    async fn test_create_recipe_validation_failure() {
        let app = init_app!();
        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/recipes")
                .set_json(json!({
                    "description": "No name",
                    "cuisine": "Italian",
                    "ingredients": [{"name": "Flour", "amount": "1 cup"}],
                    "instructions": [{"step": 1, "description": "Bake"}],
                }))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let envelope = read_envelope::<Value>(response).await;
        assert!(!envelope.success);
        assert_eq!(
            envelope.message.unwrap(),
            "Recipe name must be between 1 and 100 characters"
        );

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/recipes")
                .insert_header(("content-type", "application/json"))
                .set_payload("{not json")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_invalid_and_unknown_recipe_ids() {
        let app = init_app!();
        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/recipes/not-an-id")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let envelope = read_envelope::<Value>(response).await;
        assert_eq!(envelope.message.unwrap(), "Invalid recipe ID");

        let response = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri(&format!("/api/recipes/{}", RecordId::generate()))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let envelope = read_envelope::<Value>(response).await;
        assert_eq!(envelope.message.unwrap(), "Recipe not found");
    }

    #[actix_web::test]
    async fn test_update_and_delete_recipe() {
        let app = init_app!();
        let created = create!(app, "Pasta", "Italian");
        let uri = format!("/api/recipes/{}", created.recipe.id);

        let response = test::call_service(
            &app,
            test::TestRequest::put()
                .uri(&uri)
                .set_json(json!({"name": "Lasagne", "difficulty": "Hard"}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = read_envelope::<RecipeView>(response).await.data.unwrap();
        assert_eq!(updated.recipe.details.name, "Lasagne");
        assert_eq!(updated.recipe.details.cuisine, "Italian");

        let response = test::call_service(
            &app,
            test::TestRequest::put()
                .uri(&uri)
                .set_json(json!({"servings": 0}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response =
            test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response =
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    /// 12 recipes with limit 5 make 3 pages, the first holding the 5 newest
    async fn test_list_recipes_pagination_and_filters() {
        let app = init_app!();
        for no in 0..12 {
            let cuisine = if no % 3 == 0 { "Mexican" } else { "Italian" };
            create!(app, &format!("Dish {}", no), cuisine);
        }

        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/recipes?page=1&limit=5")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let envelope = read_envelope::<Vec<RecipeView>>(response).await;
        assert_eq!(
            envelope.pagination.unwrap(),
            Pagination {
                page: 1,
                limit: 5,
                total: 12,
                pages: 3
            }
        );
        let names: Vec<String> = envelope
            .data
            .unwrap()
            .into_iter()
            .map(|view| view.recipe.details.name)
            .collect();
        assert_eq!(names, vec!["Dish 11", "Dish 10", "Dish 9", "Dish 8", "Dish 7"]);

        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/recipes?cuisine=Mexican&search=dish%201")
                .to_request(),
        )
        .await;
        let envelope = read_envelope::<Vec<RecipeView>>(response).await;
        let names: Vec<String> = envelope
            .data
            .unwrap()
            .into_iter()
            .map(|view| view.recipe.details.name)
            .collect();
        // Mexican: 0, 3, 6, 9; none matches "dish 1"
        assert!(names.is_empty());
        assert_eq!(envelope.pagination.unwrap().pages, 0);

        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/recipes?page=abc")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/cuisines").to_request(),
        )
        .await;
        let envelope = read_envelope::<Vec<String>>(response).await;
        assert_eq!(envelope.data.unwrap(), vec!["Italian", "Mexican"]);
    }

    #[actix_web::test]
    /// Out of range paging is clamped instead of rejected
    async fn test_list_recipes_out_of_range_paging() {
        let app = init_app!();
        for no in 0..3 {
            create!(app, &format!("Dish {}", no), "Italian");
        }

        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/recipes?limit=1000")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let envelope = read_envelope::<Vec<RecipeView>>(response).await;
        assert_eq!(envelope.data.unwrap().len(), 3);
        assert_eq!(
            envelope.pagination.unwrap(),
            Pagination {
                page: 1,
                limit: 100,
                total: 3,
                pages: 1
            }
        );

        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/recipes?page=0&limit=-5")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let envelope = read_envelope::<Vec<RecipeView>>(response).await;
        assert_eq!(envelope.data.unwrap().len(), 1);
        assert_eq!(
            envelope.pagination.unwrap(),
            Pagination {
                page: 1,
                limit: 1,
                total: 3,
                pages: 3
            }
        );

        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/recipes?page=9223372036854775807&limit=10")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let envelope = read_envelope::<Vec<RecipeView>>(response).await;
        assert!(envelope.data.unwrap().is_empty());
        assert_eq!(
            envelope.pagination.unwrap(),
            Pagination {
                page: i64::MAX as u64,
                limit: 10,
                total: 3,
                pages: 1
            }
        );

        let response = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/recipes?limit=ten")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_like_requires_authentication_and_toggles() {
        let app = init_app!();
        let created = create!(app, "Pasta", "Italian");
        let uri = format!("/api/recipes/{}/like", created.recipe.id);

        let response =
            test::call_service(&app, test::TestRequest::post().uri(&uri).to_request()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let envelope = read_envelope::<Value>(response).await;
        assert_eq!(envelope.message.unwrap(), "Authentication required");

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&uri)
                .insert_header((AUTHORIZATION, "Bearer not.a.token"))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let user = RecordId::generate();
        let mut states = vec![];
        for _ in 0..2 {
            let response = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri(&uri)
                    .insert_header(bearer(&user))
                    .to_request(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
            states.push(read_envelope::<LikeStatus>(response).await.data.unwrap());
        }
        assert_eq!(
            states,
            vec![
                LikeStatus {
                    liked: true,
                    likes_count: 1
                },
                LikeStatus {
                    liked: false,
                    likes_count: 0
                }
            ]
        );
    }

    #[actix_web::test]
    async fn test_rating_bounds_and_removal() {
        let app = init_app!();
        let created = create!(app, "Pasta", "Italian");
        let uri = format!("/api/recipes/{}/rating", created.recipe.id);
        let user_1 = RecordId::generate();
        let user_2 = RecordId::generate();

        let rate = |user: &RecordId, rating: Value| {
            test::TestRequest::post()
                .uri(&uri)
                .insert_header(bearer(user))
                .set_json(json!({ "rating": rating }))
                .to_request()
        };

        for invalid in [json!(6), json!(-1), json!(2.5)] {
            let response = test::call_service(&app, rate(&user_1, invalid)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let response = test::call_service(&app, rate(&user_1, json!(0))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let envelope = read_envelope::<Value>(response).await;
        assert_eq!(envelope.message.unwrap(), "No rating found to remove");

        test::call_service(&app, rate(&user_1, json!(4))).await;
        let response = test::call_service(&app, rate(&user_2, json!(5))).await;
        let summary = read_envelope::<RatingSummary>(response).await.data.unwrap();
        assert_eq!(summary.average_rating, 4.5);
        assert_eq!(summary.ratings_count, 2);
        assert_eq!(summary.user_rating, Some(5));

        let response = test::call_service(&app, rate(&user_2, json!(0))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let summary = read_envelope::<RatingSummary>(response).await.data.unwrap();
        assert_eq!(summary.average_rating, 4.0);
        assert_eq!(summary.ratings_count, 1);

        let remove = || {
            test::TestRequest::delete()
                .uri(&uri)
                .insert_header(bearer(&user_1))
                .to_request()
        };
        let response = test::call_service(&app, remove()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let summary = read_envelope::<RatingSummary>(response).await.data.unwrap();
        assert_eq!(summary.ratings_count, 0);
        assert_eq!(summary.average_rating, 0.0);

        let response = test::call_service(&app, remove()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_comments() {
        let app = init_app!();
        let created = create!(app, "Pasta", "Italian");
        let uri = format!("/api/recipes/{}/comments", created.recipe.id);
        let author = RecordId::generate();

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&uri)
                .insert_header(bearer(&author))
                .set_json(json!({"text": "   "}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&uri)
                .insert_header(bearer(&author))
                .set_json(json!({"text": "Delicious"}))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let comment = read_envelope::<crate::api::Comment>(response)
            .await
            .data
            .unwrap();
        assert_eq!(comment.user, author);

        let response =
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        let comments = read_envelope::<Vec<crate::api::Comment>>(response)
            .await
            .data
            .unwrap();
        assert_eq!(comments, vec![comment.clone()]);

        let comment_uri = format!("{}/{}", uri, comment.id);
        let response = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri(&comment_uri)
                .insert_header(bearer(&RecordId::generate()))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri(&comment_uri)
                .insert_header(bearer(&author))
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
