// Validation utilities module
// Provides custom validation functions for domain-specific rules

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

fn phone_regex() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\d{12}$").expect("phone regex is valid"))
}

/// Phone numbers are stored as 12 digits with country code, e.g. `380123456789`
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    if phone_regex().is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_phone_number"))
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

pub fn is_valid_latitude(latitude: f64) -> bool {
    latitude.is_finite() && (-90.0..=90.0).contains(&latitude)
}

pub fn is_valid_longitude(longitude: f64) -> bool {
    longitude.is_finite() && (-180.0..=180.0).contains(&longitude)
}

/// A search radius must be a positive, finite number of kilometres
pub fn is_valid_radius(radius_km: f64) -> bool {
    radius_km.is_finite() && radius_km > 0.0
}
