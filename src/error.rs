// Error handling module for the Volunteer Hub API
// Provides the crate-wide error type and its HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::db::StoreError;

/// Main error type for the API
/// All handlers return Result<T, ApiError>; module errors convert into it.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or unusable credentials on a protected route (401)
    Unauthenticated,

    /// Wrong phone number or password at login (401)
    InvalidCredentials,

    /// Token past its expiry (401)
    ExpiredToken,

    /// Token tampered, signed with another key, or malformed (401)
    InvalidSignature,

    /// Authenticated but not allowed to perform the operation (403)
    Forbidden(String),

    /// Resource not found by ID (404)
    NotFound { resource: String, id: String },

    /// Duplicate resource conflict (409)
    Conflict { message: String },

    /// Lifecycle event not allowed from the request's current status (409)
    IllegalStateTransition { message: String },

    /// Validation errors from request DTOs (400)
    ValidationError(validator::ValidationErrors),

    /// Malformed input detected outside DTO validation (400)
    InvalidInput(String),

    /// External geocoding service unreachable or failing (503)
    GeocodingUnavailable(String),

    /// Database operation errors (500); details are only logged
    DatabaseError(sqlx::Error),

    /// Internal server errors (500); details are only logged
    InternalError(String),
}

/// Consistent error response structure
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g. "VALIDATION_ERROR", "NOT_FOUND")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (e.g. field-level validation errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// 500-level errors are logged with `error!` and replaced by a generic
    /// message so no internal detail reaches the client.
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let code = self.error_code();

        let response = match self {
            ApiError::Unauthenticated => ErrorResponse::new(code, "Authentication required"),
            ApiError::InvalidCredentials => {
                ErrorResponse::new(code, "Invalid phone number or password")
            }
            ApiError::ExpiredToken => ErrorResponse::new(code, "Token has expired"),
            ApiError::InvalidSignature => ErrorResponse::new(code, "Invalid token"),
            ApiError::Forbidden(message) => {
                warn!("Forbidden access attempt: {}", message);
                ErrorResponse::new(code, message.clone())
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                ErrorResponse::new(code, format!("{} with id {} not found", resource, id))
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                ErrorResponse::new(code, message.clone())
            }
            ApiError::IllegalStateTransition { message } => {
                debug!("Rejected transition: {}", message);
                ErrorResponse::new(code, message.clone())
            }
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                let mut response = ErrorResponse::new(code, "Request validation failed");
                response.details =
                    Some(serde_json::to_value(errors).unwrap_or(serde_json::json!({})));
                response
            }
            ApiError::InvalidInput(message) => {
                debug!("Invalid input: {}", message);
                ErrorResponse::new(code, message.clone())
            }
            ApiError::GeocodingUnavailable(message) => {
                warn!("Geocoding unavailable: {}", message);
                ErrorResponse::new(code, "Geocoding service is unavailable")
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                ErrorResponse::new(code, "A database error occurred")
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                ErrorResponse::new(code, "An internal server error occurred")
            }
        };

        (status, response)
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated
            | ApiError::InvalidCredentials
            | ApiError::ExpiredToken
            | ApiError::InvalidSignature => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } | ApiError::IllegalStateTransition { .. } => {
                StatusCode::CONFLICT
            }
            ApiError::ValidationError(_) | ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::GeocodingUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code sent as `error_code`
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::ExpiredToken => "EXPIRED_TOKEN",
            ApiError::InvalidSignature => "INVALID_SIGNATURE",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::IllegalStateTransition { .. } => "ILLEGAL_STATE_TRANSITION",
            ApiError::ValidationError(_) | ApiError::InvalidInput(_) => "VALIDATION_ERROR",
            ApiError::GeocodingUnavailable(_) => "GEOCODING_UNAVAILABLE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

/// Convert sqlx errors to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::DatabaseError(error)
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Duplicate(what) => ApiError::Conflict {
                message: format!("{} already exists", what),
            },
            StoreError::Database(db_error) => ApiError::DatabaseError(db_error),
        }
    }
}
