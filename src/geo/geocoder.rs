// Address resolution through an external geocoding service

use axum::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GeocoderProvider;
use crate::error::ApiError;
use crate::geo::{GeoPoint, LocationQuery, ResolvedLocation};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeocodingError {
    /// The service did not answer in time; safe to retry once
    #[error("geocoding request timed out")]
    Timeout,

    /// The service is unreachable or answered with an error
    #[error("geocoding service unavailable: {0}")]
    Unavailable(String),

    /// The service answered but found nothing for the query
    #[error("location not found: {0}")]
    NotFound(String),

    /// Coordinates outside the valid latitude/longitude range
    #[error("invalid coordinates: {0}, {1}")]
    InvalidCoordinates(f64, f64),
}

impl GeocodingError {
    pub fn is_transient(&self) -> bool {
        matches!(self, GeocodingError::Timeout)
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GeocodingError::Timeout
        } else {
            GeocodingError::Unavailable(err.to_string())
        }
    }
}

impl From<GeocodingError> for ApiError {
    fn from(err: GeocodingError) -> Self {
        match err {
            GeocodingError::Timeout => ApiError::GeocodingUnavailable(err.to_string()),
            GeocodingError::Unavailable(msg) => ApiError::GeocodingUnavailable(msg),
            GeocodingError::NotFound(query) => {
                ApiError::InvalidInput(format!("Location not found: {}", query))
            }
            GeocodingError::InvalidCoordinates(latitude, longitude) => ApiError::InvalidInput(
                format!("Invalid coordinates: {}, {}", latitude, longitude),
            ),
        }
    }
}

/// External collaborator that turns addresses into coordinates and back
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Forward lookup: free-text address to coordinates
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodingError>;

    /// Reverse lookup: coordinates to a formatted address
    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodingError>;
}

/// Builds the configured geocoder
pub fn from_config(
    provider: &GeocoderProvider,
    timeout: Duration,
) -> Result<Arc<dyn Geocoder>, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let geocoder: Arc<dyn Geocoder> = match provider {
        GeocoderProvider::Google { api_key } => Arc::new(GoogleGeocoder::new(client, api_key.clone())),
        GeocoderProvider::Nominatim { base_url, user_agent } => Arc::new(NominatimGeocoder::new(
            client,
            base_url.clone(),
            user_agent.clone(),
        )),
    };
    Ok(geocoder)
}

/// Resolves a location query to coordinates plus an address name.
///
/// This is the caller-side policy: a transient timeout is retried exactly once,
/// every other failure is returned as is. Coordinates whose reverse lookup
/// finds nothing keep their position without an address name.
pub async fn resolve_location(
    geocoder: &dyn Geocoder,
    query: &LocationQuery,
) -> Result<ResolvedLocation, GeocodingError> {
    match query {
        LocationQuery::Address(address) => {
            let point = match geocoder.geocode(address).await {
                Err(err) if err.is_transient() => {
                    warn!("Geocoding timed out, retrying once");
                    geocoder.geocode(address).await?
                }
                other => other?,
            };
            Ok(ResolvedLocation {
                point,
                address_name: Some(address.clone()),
            })
        }
        LocationQuery::Point(point) => {
            if !point.is_valid() {
                return Err(GeocodingError::InvalidCoordinates(point.latitude, point.longitude));
            }
            let reversed = match geocoder.reverse(*point).await {
                Err(err) if err.is_transient() => {
                    warn!("Reverse geocoding timed out, retrying once");
                    geocoder.reverse(*point).await
                }
                other => other,
            };
            let address_name = match reversed {
                Ok(address) => Some(address),
                Err(GeocodingError::NotFound(_)) => None,
                Err(err) => return Err(err),
            };
            Ok(ResolvedLocation {
                point: *point,
                address_name,
            })
        }
    }
}

// ----------------------------------------------------------------------------
// Google Maps Geocoding API
// ----------------------------------------------------------------------------

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

pub struct GoogleGeocoder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    formatted_address: Option<String>,
    geometry: GoogleGeometry,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLatLng,
}

#[derive(Debug, Deserialize)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

impl GoogleGeocoder {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: GOOGLE_GEOCODE_URL.to_string(),
        }
    }

    async fn query(&self, params: &[(&str, String)]) -> Result<GoogleResult, GeocodingError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(GeocodingError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(GeocodingError::Unavailable(format!(
                "Google Maps API returned HTTP {}",
                response.status()
            )));
        }

        let body: GoogleResponse = response.json().await.map_err(GeocodingError::from_reqwest)?;
        match body.status.as_str() {
            "OK" => body
                .results
                .into_iter()
                .next()
                .ok_or_else(|| GeocodingError::NotFound("empty result set".to_string())),
            "ZERO_RESULTS" => Err(GeocodingError::NotFound("no results".to_string())),
            status => Err(GeocodingError::Unavailable(format!(
                "Google Maps API status {}: {}",
                status,
                body.error_message.unwrap_or_default()
            ))),
        }
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodingError> {
        debug!("Google forward geocoding");
        let result = self
            .query(&[
                ("address", address.to_string()),
                ("language", "uk".to_string()),
                ("components", "country:UA".to_string()),
            ])
            .await
            .map_err(|err| match err {
                GeocodingError::NotFound(_) => GeocodingError::NotFound(address.to_string()),
                other => other,
            })?;
        Ok(GeoPoint::new(result.geometry.location.lat, result.geometry.location.lng))
    }

    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodingError> {
        debug!("Google reverse geocoding");
        let result = self
            .query(&[
                ("latlng", format!("{},{}", point.latitude, point.longitude)),
                ("language", "uk".to_string()),
            ])
            .await?;
        result
            .formatted_address
            .ok_or_else(|| GeocodingError::NotFound(format!("{},{}", point.latitude, point.longitude)))
    }
}

// ----------------------------------------------------------------------------
// OpenStreetMap Nominatim
// ----------------------------------------------------------------------------

pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    user_agent: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    // Nominatim encodes coordinates as strings
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
    error: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(client: reqwest::Client, base_url: String, user_agent: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent,
        }
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Response, GeocodingError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(params)
            .send()
            .await
            .map_err(GeocodingError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(GeocodingError::Unavailable(format!(
                "Nominatim returned HTTP {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodingError> {
        debug!("Nominatim forward geocoding");
        let places: Vec<NominatimPlace> = self
            .get(
                "search",
                &[
                    ("q", address.to_string()),
                    ("format", "json".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?
            .json()
            .await
            .map_err(GeocodingError::from_reqwest)?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| GeocodingError::NotFound(address.to_string()))?;

        match (place.lat.parse::<f64>(), place.lon.parse::<f64>()) {
            (Ok(latitude), Ok(longitude)) => Ok(GeoPoint::new(latitude, longitude)),
            _ => Err(GeocodingError::Unavailable(format!(
                "Nominatim returned unparsable coordinates {}, {}",
                place.lat, place.lon
            ))),
        }
    }

    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodingError> {
        debug!("Nominatim reverse geocoding");
        let body: NominatimReverse = self
            .get(
                "reverse",
                &[
                    ("lat", point.latitude.to_string()),
                    ("lon", point.longitude.to_string()),
                    ("format", "json".to_string()),
                ],
            )
            .await?
            .json()
            .await
            .map_err(GeocodingError::from_reqwest)?;

        match (body.error, body.display_name) {
            (None, Some(name)) if !name.is_empty() => Ok(name),
            _ => Err(GeocodingError::NotFound(format!(
                "{},{}",
                point.latitude, point.longitude
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticGeocoder;

    #[tokio::test]
    async fn address_resolution_keeps_the_given_address() {
        let geocoder = StaticGeocoder::new().with_address("Kyiv", GeoPoint::new(50.45, 30.52));
        let resolved = resolve_location(&geocoder, &LocationQuery::Address("Kyiv".into()))
            .await
            .unwrap();
        assert_eq!(resolved.point, GeoPoint::new(50.45, 30.52));
        assert_eq!(resolved.address_name.as_deref(), Some("Kyiv"));
    }

    #[tokio::test]
    async fn a_single_timeout_is_retried() {
        let geocoder = StaticGeocoder::new()
            .with_address("Kyiv", GeoPoint::new(50.45, 30.52))
            .failing_first(1, GeocodingError::Timeout);
        let resolved = resolve_location(&geocoder, &LocationQuery::Address("Kyiv".into())).await;
        assert!(resolved.is_ok());
        assert_eq!(geocoder.calls(), 2);
    }

    #[tokio::test]
    async fn a_second_timeout_is_surfaced() {
        let geocoder = StaticGeocoder::new()
            .with_address("Kyiv", GeoPoint::new(50.45, 30.52))
            .failing_first(2, GeocodingError::Timeout);
        let resolved = resolve_location(&geocoder, &LocationQuery::Address("Kyiv".into())).await;
        assert_eq!(resolved.unwrap_err(), GeocodingError::Timeout);
        assert_eq!(geocoder.calls(), 2);
    }

    #[tokio::test]
    async fn unavailable_is_not_retried() {
        let geocoder = StaticGeocoder::new()
            .failing_first(1, GeocodingError::Unavailable("connection refused".into()));
        let resolved = resolve_location(&geocoder, &LocationQuery::Address("Kyiv".into())).await;
        assert!(matches!(resolved, Err(GeocodingError::Unavailable(_))));
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn coordinates_without_known_address_still_resolve() {
        let geocoder = StaticGeocoder::new();
        let point = GeoPoint::new(50.45, 30.52);
        let resolved = resolve_location(&geocoder, &LocationQuery::Point(point)).await.unwrap();
        assert_eq!(resolved.point, point);
        assert_eq!(resolved.address_name, None);
    }

    #[tokio::test]
    async fn out_of_range_coordinates_are_rejected() {
        let geocoder = StaticGeocoder::new();
        let resolved =
            resolve_location(&geocoder, &LocationQuery::Point(GeoPoint::new(91.0, 0.0))).await;
        assert!(matches!(resolved, Err(GeocodingError::InvalidCoordinates(_, _))));
        assert_eq!(geocoder.calls(), 0);
    }
}
