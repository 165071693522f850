// Authentication and authorization error types

use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::auth::models::Role;
use crate::db::StoreError;
use crate::error::ApiError;
use crate::geo::GeocodingError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingToken,

    #[error("Authorization header is not a Bearer credential")]
    MalformedHeader,

    #[error("token has expired")]
    ExpiredToken,

    #[error("token signature or format is invalid")]
    InvalidSignature,

    /// A refresh token presented as an access token or the other way round
    #[error("expected a {expected} token")]
    WrongTokenType { expected: &'static str },

    #[error("invalid phone number or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("role '{actual}' is not allowed here")]
    InsufficientPermissions { actual: Role },

    #[error("role '{0}' cannot self-register")]
    RoleNotAllowed(Role),

    #[error("volunteers must provide a location")]
    LocationRequired,

    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("token generation failed: {0}")]
    TokenGeneration(String),

    #[error("user {0} not found")]
    UserNotFound(i32),

    #[error(transparent)]
    Geocoding(#[from] GeocodingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// What the role guard sends to clients: the precise cause is only logged
    pub fn into_guard_rejection(self, endpoint: &str) -> ApiError {
        warn!("Rejected request to {}: {}", endpoint, self);
        match self {
            AuthError::InsufficientPermissions { .. } => {
                ApiError::Forbidden("Insufficient permissions".to_string())
            }
            AuthError::AccountDisabled => ApiError::Forbidden("Account is disabled".to_string()),
            AuthError::Store(err) => err.into(),
            _ => ApiError::Unauthenticated,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::MalformedHeader => ApiError::Unauthenticated,
            AuthError::ExpiredToken => ApiError::ExpiredToken,
            AuthError::InvalidSignature | AuthError::WrongTokenType { .. } => {
                ApiError::InvalidSignature
            }
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::AccountDisabled => ApiError::Forbidden("Account is disabled".to_string()),
            AuthError::InsufficientPermissions { .. } => {
                ApiError::Forbidden("Insufficient permissions".to_string())
            }
            AuthError::RoleNotAllowed(role) => {
                ApiError::InvalidInput(format!("Role '{}' cannot register itself", role))
            }
            AuthError::LocationRequired => {
                ApiError::InvalidInput("Volunteers must provide a location".to_string())
            }
            AuthError::WeakPassword(reason) => ApiError::InvalidInput(reason),
            AuthError::PasswordHash(msg) | AuthError::TokenGeneration(msg) => {
                ApiError::InternalError(msg)
            }
            AuthError::UserNotFound(id) => ApiError::not_found("User", id),
            AuthError::Geocoding(err) => err.into(),
            AuthError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
