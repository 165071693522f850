// HTTP handlers for help requests, grouped by the role that calls them

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::models::Identity;
use crate::error::{ApiError, ErrorResponse};
use crate::geo::Candidate;
use crate::requests::models::{
    AvailableRequest, CreateHelpRequest, HelpRequest, HelpRequestResponse, StatusFilter,
    TransitionRecord, VolunteerRating, VolunteerScopeQuery,
};
use crate::AppState;

fn responses(requests: Vec<HelpRequest>) -> Json<Vec<HelpRequestResponse>> {
    Json(requests.into_iter().map(HelpRequestResponse::from).collect())
}

// ============================================================================
// Beneficiary
// ============================================================================

/// Handler for POST /beneficiary/requests
#[utoipa::path(
    post,
    path = "/beneficiary/requests",
    request_body = CreateHelpRequest,
    responses(
        (status = 201, description = "Request submitted", body = HelpRequestResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 403, description = "Beneficiary not verified", body = ErrorResponse),
        (status = 503, description = "Geocoding service unavailable", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "beneficiary"
)]
pub async fn submit_request_handler(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<CreateHelpRequest>,
) -> Result<(StatusCode, Json<HelpRequestResponse>), ApiError> {
    request.validate()?;
    let created = state.request_service.submit(identity, request).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Handler for GET /beneficiary/requests
#[utoipa::path(
    get,
    path = "/beneficiary/requests",
    params(StatusFilter),
    responses(
        (status = 200, description = "The beneficiary's requests, newest first", body = Vec<HelpRequestResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "beneficiary"
)]
pub async fn my_requests_handler(
    State(state): State<AppState>,
    identity: Identity,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<HelpRequestResponse>>, ApiError> {
    let requests = state
        .request_service
        .beneficiary_requests(identity, filter.status)
        .await?;
    Ok(responses(requests))
}

/// Handler for GET /beneficiary/requests/{id}
#[utoipa::path(
    get,
    path = "/beneficiary/requests/{id}",
    params(("id" = Uuid, Path, description = "Help request ID")),
    responses(
        (status = 200, description = "Request found", body = HelpRequestResponse),
        (status = 404, description = "Request not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "beneficiary"
)]
pub async fn my_request_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<HelpRequestResponse>, ApiError> {
    let request = state.request_service.find_owned(identity, id).await?;
    Ok(Json(request.into()))
}

/// Handler for GET /beneficiary/requests/{id}/candidates
#[utoipa::path(
    get,
    path = "/beneficiary/requests/{id}/candidates",
    params(("id" = Uuid, Path, description = "Help request ID")),
    responses(
        (status = 200, description = "Volunteers in range, nearest first", body = Vec<Candidate>),
        (status = 404, description = "Request not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "beneficiary"
)]
pub async fn request_candidates_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Candidate>>, ApiError> {
    Ok(Json(state.request_service.candidates_for(identity, id).await?))
}

/// Handler for POST /beneficiary/requests/{id}/cancel
#[utoipa::path(
    post,
    path = "/beneficiary/requests/{id}/cancel",
    params(("id" = Uuid, Path, description = "Help request ID")),
    responses(
        (status = 200, description = "Request cancelled", body = HelpRequestResponse),
        (status = 404, description = "No such request among the caller's own", body = ErrorResponse),
        (status = 409, description = "Request can no longer be cancelled", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "beneficiary"
)]
pub async fn beneficiary_cancel_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<HelpRequestResponse>, ApiError> {
    Ok(Json(state.request_service.cancel(identity, id).await?.into()))
}

// ============================================================================
// Volunteer
// ============================================================================

/// Handler for GET /volunteer/requests/available
#[utoipa::path(
    get,
    path = "/volunteer/requests/available",
    responses(
        (status = 200, description = "Submitted requests in range, nearest first", body = Vec<AvailableRequest>),
        (status = 403, description = "Volunteer not verified", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "volunteer"
)]
pub async fn available_requests_handler(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<AvailableRequest>>, ApiError> {
    Ok(Json(state.request_service.available_for(identity).await?))
}

/// Handler for GET /volunteer/requests
#[utoipa::path(
    get,
    path = "/volunteer/requests",
    params(VolunteerScopeQuery),
    responses(
        (status = 200, description = "The volunteer's active or finished requests", body = Vec<HelpRequestResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "volunteer"
)]
pub async fn volunteer_requests_handler(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<VolunteerScopeQuery>,
) -> Result<Json<Vec<HelpRequestResponse>>, ApiError> {
    let requests = state
        .request_service
        .volunteer_requests(identity, query.scope)
        .await?;
    Ok(responses(requests))
}

/// Handler for POST /volunteer/requests/{id}/accept
#[utoipa::path(
    post,
    path = "/volunteer/requests/{id}/accept",
    params(("id" = Uuid, Path, description = "Help request ID")),
    responses(
        (status = 200, description = "Request assigned to the caller", body = HelpRequestResponse),
        (status = 403, description = "Out of range, outside subscribed categories, expired, or three requests already active", body = ErrorResponse),
        (status = 409, description = "Request is no longer open", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "volunteer"
)]
pub async fn accept_request_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<HelpRequestResponse>, ApiError> {
    Ok(Json(state.request_service.accept(identity, id).await?.into()))
}

/// Handler for POST /volunteer/requests/{id}/start
#[utoipa::path(
    post,
    path = "/volunteer/requests/{id}/start",
    params(("id" = Uuid, Path, description = "Help request ID")),
    responses(
        (status = 200, description = "Work started", body = HelpRequestResponse),
        (status = 403, description = "Not the assigned volunteer", body = ErrorResponse),
        (status = 409, description = "Request is not assigned", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "volunteer"
)]
pub async fn start_request_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<HelpRequestResponse>, ApiError> {
    Ok(Json(state.request_service.start(identity, id).await?.into()))
}

/// Handler for POST /volunteer/requests/{id}/finish
#[utoipa::path(
    post,
    path = "/volunteer/requests/{id}/finish",
    params(("id" = Uuid, Path, description = "Help request ID")),
    responses(
        (status = 200, description = "Request completed", body = HelpRequestResponse),
        (status = 403, description = "Not the assigned volunteer", body = ErrorResponse),
        (status = 409, description = "Request is not in progress", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "volunteer"
)]
pub async fn volunteer_finish_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<HelpRequestResponse>, ApiError> {
    Ok(Json(state.request_service.finish(identity, id).await?.into()))
}

/// Handler for GET /volunteer/rating
#[utoipa::path(
    get,
    path = "/volunteer/rating",
    responses(
        (status = 200, description = "Volunteers by completed requests", body = Vec<VolunteerRating>)
    ),
    security(("bearer_auth" = [])),
    tag = "volunteer"
)]
pub async fn rating_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<VolunteerRating>>, ApiError> {
    Ok(Json(state.request_service.rating().await?))
}

// ============================================================================
// Moderator
// ============================================================================

/// Handler for GET /moderator/requests
#[utoipa::path(
    get,
    path = "/moderator/requests",
    params(StatusFilter),
    responses(
        (status = 200, description = "All requests, newest first", body = Vec<HelpRequestResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn all_requests_handler(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<HelpRequestResponse>>, ApiError> {
    Ok(responses(state.request_service.list_all(filter.status).await?))
}

/// Handler for GET /moderator/requests/{id}/history
#[utoipa::path(
    get,
    path = "/moderator/requests/{id}/history",
    params(("id" = Uuid, Path, description = "Help request ID")),
    responses(
        (status = 200, description = "Applied transitions, oldest first", body = Vec<TransitionRecord>),
        (status = 404, description = "Request not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn request_history_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TransitionRecord>>, ApiError> {
    Ok(Json(state.request_service.history(id).await?))
}

/// Handler for GET /moderator/requests/{id}/candidates
#[utoipa::path(
    get,
    path = "/moderator/requests/{id}/candidates",
    params(("id" = Uuid, Path, description = "Help request ID")),
    responses(
        (status = 200, description = "Volunteers in range, nearest first", body = Vec<Candidate>),
        (status = 404, description = "Request not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn moderator_candidates_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Candidate>>, ApiError> {
    Ok(Json(state.request_service.candidates_for(identity, id).await?))
}

/// Handler for POST /moderator/requests/{id}/cancel
#[utoipa::path(
    post,
    path = "/moderator/requests/{id}/cancel",
    params(("id" = Uuid, Path, description = "Help request ID")),
    responses(
        (status = 200, description = "Request cancelled", body = HelpRequestResponse),
        (status = 409, description = "Request can no longer be cancelled", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn moderator_cancel_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<HelpRequestResponse>, ApiError> {
    Ok(Json(state.request_service.cancel(identity, id).await?.into()))
}

/// Handler for POST /moderator/requests/{id}/finish
#[utoipa::path(
    post,
    path = "/moderator/requests/{id}/finish",
    params(("id" = Uuid, Path, description = "Help request ID")),
    responses(
        (status = 200, description = "Request completed", body = HelpRequestResponse),
        (status = 409, description = "Request is not in progress", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn moderator_finish_handler(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<HelpRequestResponse>, ApiError> {
    Ok(Json(state.request_service.finish(identity, id).await?.into()))
}
