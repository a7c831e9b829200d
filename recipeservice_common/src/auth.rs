use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use paperclip::actix::Apiv2Security;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::ApiError;
use crate::record_id::RecordId;

/// Used when no secret is configured. Only suitable for local development.
pub const DEVELOPMENT_JWT_SECRET: &str = "recipeservice-development-secret";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No bearer token provided")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::debug!("Rejecting request: {}", err);
        ApiError::Authentication
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: RecordId,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys for bearer tokens
#[derive(Clone)]
pub struct JwtKeys {
    key: Hmac<Sha256>,
    token_ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, token_ttl: Duration) -> anyhow::Result<Self> {
        let key = Hmac::new_from_slice(secret.as_bytes())
            .map_err(|err| anyhow::anyhow!("Invalid jwt secret {}", err))?;
        Ok(Self { key, token_ttl })
    }

    pub fn issue(&self, user_id: &RecordId) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user_id.clone(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        claims.sign_with_key(&self.key).map_err(ApiError::internal)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let claims: Claims = token
            .verify_with_key(&self.key)
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}

/// Returns the token of an `Authorization: Bearer <token>` header
pub fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

pub fn authenticate(req: &HttpRequest) -> Result<RecordId, ApiError> {
    let keys = req
        .app_data::<web::Data<JwtKeys>>()
        .ok_or_else(|| ApiError::internal("JwtKeys not registered in app data"))?;
    let token = bearer_token(req)?;
    Ok(keys.verify(token)?.user_id)
}

/// Extractor resolving the caller from the bearer token. Rejects with 401.
#[derive(Debug, Clone, Apiv2Security)]
#[openapi(
    apiKey,
    in = "header",
    name = "Authorization",
    description = "Use format 'Bearer TOKEN'"
)]
pub struct AuthenticatedUser {
    pub user_id: RecordId,
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map(|user_id| AuthenticatedUser { user_id }))
    }
}
