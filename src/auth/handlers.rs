// HTTP handlers for authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::auth::models::{
    AuthResponse, Identity, LoginRequest, RefreshRequest, RegisterRequest, UserResponse,
};
use crate::error::{ApiError, ErrorResponse};
use crate::AppState;

/// Handler for POST /auth/register
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, tokens issued", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Phone number already registered", body = ErrorResponse),
        (status = 503, description = "Geocoding service unavailable", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    request.validate()?;
    let response = state.auth_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for POST /auth/login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid phone number or password", body = ErrorResponse),
        (status = 403, description = "Account disabled", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // Malformed phone numbers cannot match an account
    if request.validate().is_err() {
        return Err(ApiError::InvalidCredentials);
    }
    Ok(Json(state.auth_service.login(request).await?))
}

/// Handler for POST /auth/refresh
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Refresh token expired or invalid", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    Ok(Json(state.auth_service.refresh(&request.refresh_token).await?))
}

/// Handler for GET /auth/me
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user's profile", body = UserResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.auth_service.me(identity).await?))
}
