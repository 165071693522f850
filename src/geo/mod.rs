// Geolocation: coordinates, distance math, geocoding and volunteer matching

pub mod distance;
pub mod geocoder;
pub mod handlers;
pub mod matcher;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::validation::{is_valid_latitude, is_valid_longitude};

pub use distance::{haversine_km, BoundingBox};
pub use geocoder::{resolve_location, Geocoder, GeocodingError, GoogleGeocoder, NominatimGeocoder};
pub use matcher::{Candidate, GeoMatcher, MatchError};

/// A point on the Earth's surface in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 50.45)]
    pub latitude: f64,
    #[schema(example = 30.52)]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_latitude(self.latitude) && is_valid_longitude(self.longitude)
    }
}

/// Location as supplied by a client: a free-text address or a coordinate pair
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct LocationInput {
    #[schema(example = "Khreshchatyk St, 22, Kyiv")]
    #[validate(length(min = 1, max = 500))]
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
}

impl LocationInput {
    /// An address wins over coordinates when both are given
    pub fn to_query(&self) -> Option<LocationQuery> {
        if let Some(address) = self.address.as_deref().map(str::trim) {
            if !address.is_empty() {
                return Some(LocationQuery::Address(address.to_string()));
            }
        }
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                Some(LocationQuery::Point(GeoPoint::new(latitude, longitude)))
            }
            _ => None,
        }
    }
}

/// What the matcher and geocoder accept as a location
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Address(String),
    Point(GeoPoint),
}

/// A location after geocoding: coordinates plus a human readable address when known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedLocation {
    pub point: GeoPoint,
    pub address_name: Option<String>,
}

/// Location as returned in API responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub address_name: Option<String>,
}

impl LocationResponse {
    pub fn new(point: GeoPoint, address_name: Option<String>) -> Self {
        Self {
            latitude: point.latitude,
            longitude: point.longitude,
            address_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_takes_precedence_over_coordinates() {
        let input = LocationInput {
            address: Some("Kyiv".into()),
            latitude: Some(1.0),
            longitude: Some(2.0),
        };
        assert_eq!(input.to_query(), Some(LocationQuery::Address("Kyiv".into())));
    }

    #[test]
    fn blank_address_falls_back_to_coordinates() {
        let input = LocationInput {
            address: Some("  ".into()),
            latitude: Some(50.45),
            longitude: Some(30.52),
        };
        assert_eq!(
            input.to_query(),
            Some(LocationQuery::Point(GeoPoint::new(50.45, 30.52)))
        );
    }

    #[test]
    fn half_a_coordinate_pair_is_no_location() {
        let input = LocationInput {
            address: None,
            latitude: Some(50.45),
            longitude: None,
        };
        assert_eq!(input.to_query(), None);
    }
}
