use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
};
use validator::Validate;

use recipeservice_common::auth::{AuthenticatedUser, JwtKeys};
use recipeservice_common::envelope::ApiResponse;
use recipeservice_common::error::ApiError;
use recipeservice_common::RecordId;

use crate::api::{
    AddToCartRequest, AuthResponse, LoginRequest, RegisterRequest, RemoveFromCartQuery, User,
};
use crate::password::{hash_password, verify_password};
use crate::recipe_catalog::{resolve_cart, RecipeCatalog};
use crate::users_repository::UsersRepository;

type Repository = Data<Arc<dyn UsersRepository>>;
type Catalog = Data<Arc<dyn RecipeCatalog>>;

fn auth_response(keys: &JwtKeys, user: &User) -> Result<AuthResponse, ApiError> {
    Ok(AuthResponse {
        token: keys.issue(&user.id)?,
        user: user.profile(),
    })
}

async fn cart_response(
    catalog: &dyn RecipeCatalog,
    user: User,
    message: Option<&str>,
) -> Result<HttpResponse, ApiError> {
    let entries = resolve_cart(catalog, user.cart)
        .await
        .map_err(ApiError::internal)?;
    let response = ApiResponse::success(entries);
    Ok(match message {
        Some(message) => response.with_message(message),
        None => response,
    }
    .ok())
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn register(
    users_repository: Repository,
    keys: Data<JwtKeys>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let mut request = request.into_inner();
    request.username = request.username.trim().to_string();
    request.email = request.email.trim().to_string();
    request.validate()?;

    if users_repository
        .find_user_by_email(&request.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let password = request.password;
    // argon2 is CPU bound, keep it off the async workers
    let password_hash = actix_web::web::block(move || hash_password(&password))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;

    let user = users_repository
        .add_user(User::new(&request.username, &request.email, password_hash))
        .await?;
    tracing::info!("Registered user {}", user.id);

    Ok(ApiResponse::success(auth_response(&keys, &user)?)
        .with_message("User registered successfully")
        .respond(StatusCode::CREATED))
}

#[api_v2_operation]
pub async fn login(
    users_repository: Repository,
    keys: Data<JwtKeys>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let LoginRequest { email, password } = request.into_inner();
    let user = users_repository
        .find_user_by_email(&email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let password_hash = user.password_hash.clone();
    let verified = actix_web::web::block(move || verify_password(&password, &password_hash))
        .await
        .map_err(ApiError::internal)?;
    if !verified {
        return Err(ApiError::InvalidCredentials);
    }

    Ok(ApiResponse::success(auth_response(&keys, &user)?)
        .with_message("Login successful")
        .ok())
}

#[api_v2_operation]
pub async fn me(
    users_repository: Repository,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let user = users_repository.get_user(&user.user_id).await?;
    Ok(ApiResponse::success(user.profile()).ok())
}

#[api_v2_operation]
pub async fn get_cart(
    users_repository: Repository,
    catalog: Catalog,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let user = users_repository.get_user(&user.user_id).await?;
    cart_response(&***catalog, user, None).await
}

#[api_v2_operation]
pub async fn add_to_cart(
    users_repository: Repository,
    catalog: Catalog,
    user: AuthenticatedUser,
    request: web::Json<AddToCartRequest>,
) -> Result<HttpResponse, ApiError> {
    let recipe_id = RecordId::parse(request.recipe_id.trim())
        .map_err(|_| ApiError::Validation("Invalid recipe ID".into()))?;
    let quantity = request.quantity.unwrap_or(1);
    if quantity < 1 {
        return Err(ApiError::Validation("Quantity must be at least 1".into()));
    }
    let quantity = u32::try_from(quantity)
        .map_err(|_| ApiError::Validation("Quantity is too large".into()))?;

    // the user document must exist before the recipe lookup
    users_repository.get_user(&user.user_id).await?;
    if catalog
        .find_recipe(&recipe_id)
        .await
        .map_err(ApiError::internal)?
        .is_none()
    {
        return Err(ApiError::NotFound("Recipe not found".into()));
    }

    let updated = users_repository
        .add_to_cart(&user.user_id, &recipe_id, quantity)
        .await?;
    cart_response(&***catalog, updated, Some("Recipe added to cart")).await
}

#[api_v2_operation]
pub async fn remove_from_cart(
    users_repository: Repository,
    catalog: Catalog,
    user: AuthenticatedUser,
    query: web::Query<RemoveFromCartQuery>,
) -> Result<HttpResponse, ApiError> {
    let item_id = RecordId::parse(query.item_id.trim())
        .map_err(|_| ApiError::Validation("Invalid cart item ID".into()))?;
    let updated = users_repository
        .remove_from_cart(&user.user_id, &item_id)
        .await?;
    cart_response(
        &***catalog,
        updated,
        Some("Recipe removed from cart"),
    )
    .await
}
