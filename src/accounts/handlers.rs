// HTTP handlers for profile and account management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::accounts::models::{CreateStaffRequest, UpdateVolunteerProfile, VolunteerProfile};
use crate::auth::models::{Identity, Role, UserResponse};
use crate::error::{ApiError, ErrorResponse};
use crate::AppState;

/// Handler for GET /volunteer/profile
#[utoipa::path(
    get,
    path = "/volunteer/profile",
    responses(
        (status = 200, description = "Volunteer profile with subscribed categories", body = VolunteerProfile),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "volunteer"
)]
pub async fn volunteer_profile_handler(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<VolunteerProfile>, ApiError> {
    let profile = state.account_service.volunteer_profile(identity).await?;
    Ok(Json(profile))
}

/// Handler for PATCH /volunteer/profile
#[utoipa::path(
    patch,
    path = "/volunteer/profile",
    request_body = UpdateVolunteerProfile,
    responses(
        (status = 200, description = "Profile updated", body = VolunteerProfile),
        (status = 400, description = "Invalid input or unknown category", body = ErrorResponse),
        (status = 503, description = "Geocoding service unavailable", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "volunteer"
)]
pub async fn update_volunteer_profile_handler(
    State(state): State<AppState>,
    identity: Identity,
    Json(update): Json<UpdateVolunteerProfile>,
) -> Result<Json<VolunteerProfile>, ApiError> {
    update.validate()?;
    let profile = state
        .account_service
        .update_volunteer_profile(identity, update)
        .await?;
    Ok(Json(profile))
}

/// Handler for DELETE /volunteer/profile
#[utoipa::path(
    delete,
    path = "/volunteer/profile",
    responses(
        (status = 200, description = "Profile disabled", body = UserResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "volunteer"
)]
pub async fn disable_volunteer_handler(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.account_service.disable_self(identity).await?))
}

/// Handler for DELETE /beneficiary/profile
#[utoipa::path(
    delete,
    path = "/beneficiary/profile",
    responses(
        (status = 200, description = "Profile disabled", body = UserResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "beneficiary"
)]
pub async fn disable_beneficiary_handler(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.account_service.disable_self(identity).await?))
}

/// Handler for GET /moderator/users/unverified
#[utoipa::path(
    get,
    path = "/moderator/users/unverified",
    responses(
        (status = 200, description = "Users awaiting verification", body = Vec<UserResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn unverified_users_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(Json(state.account_service.list_unverified().await?))
}

/// Handler for POST /moderator/users/{id}/verify
#[utoipa::path(
    post,
    path = "/moderator/users/{id}/verify",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User verified", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn verify_user_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.account_service.verify(id).await?))
}

/// Handler for POST /moderator/users/{id}/disable
#[utoipa::path(
    post,
    path = "/moderator/users/{id}/disable",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User disabled", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn disable_user_handler(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.account_service.disable(id).await?))
}

/// Handler for POST /moderator/staff
#[utoipa::path(
    post,
    path = "/moderator/staff",
    request_body = CreateStaffRequest,
    responses(
        (status = 201, description = "Staff account created", body = UserResponse),
        (status = 400, description = "Invalid input or non-staff role", body = ErrorResponse),
        (status = 409, description = "Phone number already registered", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn create_staff_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    request.validate()?;
    let user = state.account_service.create_staff(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for GET /developers/roles
#[utoipa::path(
    get,
    path = "/developers/roles",
    responses(
        (status = 200, description = "All roles", body = Vec<Role>)
    ),
    security(("bearer_auth" = [])),
    tag = "developers"
)]
pub async fn list_roles_handler(State(state): State<AppState>) -> Json<Vec<Role>> {
    Json(state.account_service.roles())
}
