use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use paperclip::actix::api_v2_errors;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::envelope::ApiResponse;

pub const AUTHENTICATION_REQUIRED: &str = "Authentication required";
pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";

/// Error returned by every handler, rendered as the failure envelope
#[api_v2_errors(
    code = 400,
    description = "Invalid input",
    code = 401,
    description = "Authentication required",
    code = 403,
    description = "Not allowed for the caller",
    code = 404,
    description = "Resource not found",
    code = 409,
    description = "Resource already exists",
    code = 500,
    description = "Internal server error"
)]
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication required")]
    Authentication,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(validation_message(&errors))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Internal(cause) => {
                tracing::error!("Request failed {}", cause);
                INTERNAL_SERVER_ERROR.to_string()
            }
            other => other.to_string(),
        };
        ApiResponse::failure(message).respond(self.status_code())
    }
}

/// Flattens validator errors (nested structs and lists included) into one message.
/// Messages are sorted so that the output does not depend on map ordering.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_messages(errors, &mut messages);
    messages.sort();
    messages.dedup();
    messages.join(", ")
}

fn collect_messages(errors: &ValidationErrors, messages: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                messages.extend(field_errors.iter().map(|error| {
                    error
                        .message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                }))
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(nested, messages),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect_messages(nested, messages)
                }
            }
        }
    }
}

/// Renders malformed JSON bodies as a 400 envelope instead of actix's plain text
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    ApiError::Validation(format!("Invalid request body: {}", err)).into()
}

/// Renders malformed query strings as a 400 envelope
pub fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &HttpRequest,
) -> actix_web::Error {
    ApiError::Validation(format!("Invalid query parameters: {}", err)).into()
}
