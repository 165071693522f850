// Pairs a location with nearby volunteers, nearest first

use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use crate::auth::models::{User, UserResponse};
use crate::auth::repository::UserStore;
use crate::db::StoreError;
use crate::error::ApiError;
use crate::geo::{haversine_km, BoundingBox, GeoPoint, Geocoder, GeocodingError, LocationQuery};
use crate::validation::is_valid_radius;

/// A volunteer within range of a location
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Candidate {
    pub volunteer: UserResponse,
    #[schema(example = 1.25)]
    pub distance_km: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("radius must be a positive number of kilometres, got {0}")]
    InvalidRadius(f64),

    #[error(transparent)]
    Geocoding(#[from] GeocodingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidRadius(radius) => {
                ApiError::InvalidInput(format!("Invalid radius: {} km", radius))
            }
            MatchError::Geocoding(err) => err.into(),
            MatchError::Store(err) => err.into(),
        }
    }
}

/// Finds candidate volunteers around a location
#[derive(Clone)]
pub struct GeoMatcher {
    users: Arc<dyn UserStore>,
    geocoder: Arc<dyn Geocoder>,
}

impl GeoMatcher {
    pub fn new(users: Arc<dyn UserStore>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { users, geocoder }
    }

    /// Candidates for a free-text address or coordinate pair.
    ///
    /// Addresses go through the geocoder exactly once: a timeout surfaces as
    /// an error and retrying is left to the caller.
    pub async fn find_candidates(
        &self,
        location: &LocationQuery,
        max_radius_km: f64,
    ) -> Result<Vec<Candidate>, MatchError> {
        if !is_valid_radius(max_radius_km) {
            return Err(MatchError::InvalidRadius(max_radius_km));
        }

        let origin = match location {
            LocationQuery::Address(address) => self.geocoder.geocode(address).await?,
            LocationQuery::Point(point) => *point,
        };

        self.find_candidates_near(origin, max_radius_km).await
    }

    /// Candidates around already known coordinates
    pub async fn find_candidates_near(
        &self,
        origin: GeoPoint,
        max_radius_km: f64,
    ) -> Result<Vec<Candidate>, MatchError> {
        if !is_valid_radius(max_radius_km) {
            return Err(MatchError::InvalidRadius(max_radius_km));
        }
        if !origin.is_valid() {
            return Err(GeocodingError::InvalidCoordinates(origin.latitude, origin.longitude).into());
        }

        let bbox = BoundingBox::around(origin, max_radius_km);
        let volunteers = self.users.volunteers_within(bbox).await?;
        let candidates = rank_candidates(origin, volunteers, max_radius_km);

        debug!(
            "Found {} candidate volunteers within {} km",
            candidates.len(),
            max_radius_km
        );
        Ok(candidates)
    }

    /// Whether a specific volunteer is among the candidates for a location
    pub async fn is_candidate(
        &self,
        volunteer_id: i32,
        origin: GeoPoint,
        max_radius_km: f64,
    ) -> Result<bool, MatchError> {
        Ok(self
            .find_candidates_near(origin, max_radius_km)
            .await?
            .iter()
            .any(|candidate| candidate.volunteer.id == volunteer_id))
    }
}

/// Keeps matchable volunteers within `max_radius_km` of `origin`, ordered by
/// distance then volunteer id
pub fn rank_candidates(
    origin: GeoPoint,
    volunteers: impl IntoIterator<Item = User>,
    max_radius_km: f64,
) -> Vec<Candidate> {
    let mut ranked: Vec<(f64, User)> = volunteers
        .into_iter()
        .filter(User::is_matchable_volunteer)
        .filter_map(|user| {
            let distance = haversine_km(origin, user.location()?);
            (distance <= max_radius_km).then_some((distance, user))
        })
        .collect();

    ranked.sort_by(|(da, a), (db, b)| {
        da.partial_cmp(db)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    ranked
        .into_iter()
        .map(|(distance_km, user)| Candidate {
            volunteer: user.into(),
            distance_km,
        })
        .collect()
}
