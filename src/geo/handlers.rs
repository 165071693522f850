// HTTP handlers for location search

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use crate::error::{ApiError, ErrorResponse};
use crate::geo::{Candidate, LocationInput};
use crate::AppState;

/// Query parameters for the nearby-volunteer search
#[derive(Debug, Deserialize, Validate, IntoParams)]
pub struct NearbyVolunteersQuery {
    /// Free-text address; wins over coordinates
    #[validate(length(min = 1, max = 500))]
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    /// Defaults to the configured search radius
    pub radius_km: Option<f64>,
}

/// Handler for GET /moderator/volunteers/nearby
/// Lists active, verified volunteers around a location, nearest first
#[utoipa::path(
    get,
    path = "/moderator/volunteers/nearby",
    params(NearbyVolunteersQuery),
    responses(
        (status = 200, description = "Volunteers within the radius", body = Vec<Candidate>),
        (status = 400, description = "Missing location or invalid radius", body = ErrorResponse),
        (status = 503, description = "Geocoding service unavailable", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "moderator"
)]
pub async fn nearby_volunteers_handler(
    State(state): State<AppState>,
    Query(query): Query<NearbyVolunteersQuery>,
) -> Result<Json<Vec<Candidate>>, ApiError> {
    query.validate()?;

    let location = LocationInput {
        address: query.address,
        latitude: query.latitude,
        longitude: query.longitude,
    }
    .to_query()
    .ok_or_else(|| {
        ApiError::InvalidInput("Either an address or latitude and longitude is required".into())
    })?;

    let radius_km = query.radius_km.unwrap_or(state.default_radius_km);
    tracing::debug!("Nearby volunteer search within {} km", radius_km);

    let candidates = state.matcher.find_candidates(&location, radius_km).await?;
    Ok(Json(candidates))
}
